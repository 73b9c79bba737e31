//! Startup recovery
//!
//! Turns whatever the snapshot store holds into a starting state. Nothing
//! found here stops the process: an unreadable snapshot is set aside and the
//! store starts fresh.

use super::traits::SnapshotStore;
use crate::store::AppState;

/// Where the starting state came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSource {
    /// Nothing was ever saved
    Fresh,
    /// A snapshot of the given layout version was loaded
    Snapshot { version: u32 },
    /// The stored snapshot could not be read and was set aside
    Unreadable { error: String },
}

/// Result of startup recovery
#[derive(Debug)]
pub struct Restored {
    pub state: AppState,
    pub source: RestoreSource,
}

/// Load the starting state from `store`
pub async fn restore_state<S: SnapshotStore + ?Sized>(store: &S) -> Restored {
    match store.load().await {
        Ok(Some(snapshot)) => {
            let version = snapshot.version;
            tracing::info!(version, "Restoring saved state");
            Restored {
                state: snapshot.into_state(),
                source: RestoreSource::Snapshot { version },
            }
        }
        Ok(None) => {
            tracing::info!("No saved state, starting fresh");
            Restored {
                state: AppState::default(),
                source: RestoreSource::Fresh,
            }
        }
        Err(error) => {
            tracing::error!(error = %error, "Saved state is unreadable, starting fresh");
            if let Err(e) = store.set_aside().await {
                // The next save will replace it
                tracing::error!(error = %e, "Failed to set aside unreadable snapshot");
            }
            Restored {
                state: AppState::default(),
                source: RestoreSource::Unreadable { error },
            }
        }
    }
}
