//! API request and response types

use crate::catalog::{Achievement, Mood, Persona, Theme};
use crate::store::AppState;
use serde::Serialize;

/// Response for an accepted action
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    /// State right after the transition; generation may still be running
    pub state: AppState,
}

/// Every static descriptor screens render from
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub personas: &'static [Persona],
    pub moods: &'static [Mood],
    pub achievements: &'static [Achievement],
    pub themes: &'static [Theme],
}

/// Generation backend in use
#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub model: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
