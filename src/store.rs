//! Application store
//!
//! Elm Architecture: screens dispatch actions, a pure transition produces the
//! next state plus effects, and the runtime executes the effects.

mod effect;
pub mod event;
pub mod gamification;
pub mod snapshot;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Action, Event};
pub use snapshot::{PersistedSnapshot, SNAPSHOT_VERSION};
pub use state::{AppState, StoreContext};
pub use transition::{transition, TransitionError, TransitionResult, SUMMARY_FALLBACK};
