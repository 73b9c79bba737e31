//! HTTP API for Fadfada
//!
//! Screens read state, dispatch actions and follow updates over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::StoreHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: StoreHandle,
    /// Model id reported by the generation client
    pub model: String,
}

impl ApiState {
    pub fn new(store: StoreHandle, model: impl Into<String>) -> Self {
        Self {
            store,
            model: model.into(),
        }
    }
}
