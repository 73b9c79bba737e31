//! Runtime for the application store
//!
//! A single task owns `AppState` and applies events one at a time. Screens
//! talk to it through a cloneable `StoreHandle`.

mod executor;
mod recovery;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::StoreRuntime;
pub use recovery::{restore_state, Restored};
pub use traits::*;

use crate::store::{Action, AppState, Event, TransitionError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Notifications published to subscribers
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    /// State after a transition that changed it
    StateChanged { state: Arc<AppState> },
    /// One-shot notice for a fresh unlock
    AchievementUnlocked { achievement_id: String },
    /// An action failed its preconditions and did nothing
    Rejected { reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store runtime has stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// An event plus an optional channel for the transition outcome
#[derive(Debug)]
pub(crate) struct Envelope {
    pub event: Event,
    pub ack: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

impl Envelope {
    pub fn event(event: Event) -> Self {
        Self { event, ack: None }
    }
}

/// Handle to interact with the running store
#[derive(Clone)]
pub struct StoreHandle {
    event_tx: mpsc::Sender<Envelope>,
    state_rx: watch::Receiver<Arc<AppState>>,
    updates_tx: broadcast::Sender<StoreUpdate>,
}

impl StoreHandle {
    /// Apply an action and wait for its outcome
    ///
    /// Returns once the transition has run; generation started by the
    /// action continues in the background.
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let (ack, outcome) = oneshot::channel();
        self.event_tx
            .send(Envelope {
                event: Event::Action(action),
                ack: Some(ack),
            })
            .await
            .map_err(|_| StoreError::Stopped)?;
        outcome.await.map_err(|_| StoreError::Stopped)??;
        Ok(())
    }

    /// Latest state
    pub fn snapshot(&self) -> Arc<AppState> {
        self.state_rx.borrow().clone()
    }

    /// Receiver that always holds the latest state
    pub fn watch(&self) -> watch::Receiver<Arc<AppState>> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates_tx.subscribe()
    }
}
