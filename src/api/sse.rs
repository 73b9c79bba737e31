//! Server-Sent Events support
//!
//! Screens follow the store through one stream: an `init` event carrying the
//! current state, then every update the runtime publishes.

use crate::runtime::StoreUpdate;
use crate::store::AppState;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert the store's broadcast channel to an SSE stream
pub fn sse_stream(
    initial: Arc<AppState>,
    updates_rx: tokio::sync::broadcast::Receiver<StoreUpdate>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(to_axum_event("init", json!({ "type": "init", "state": &*initial })))
    });

    let updates = BroadcastStream::new(updates_rx).filter_map(|result| match result {
        Ok(update) => {
            let (event_type, data) = update_payload(&update);
            Some(Ok(to_axum_event(event_type, data)))
        }
        Err(e) => {
            // Lagged subscribers catch up on the next state_change
            tracing::debug!(error = %e, "SSE subscriber lagged");
            None
        }
    });

    Sse::new(init.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_axum_event(event_type: &str, data: Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}

/// Event name and JSON body for a store update
pub(super) fn update_payload(update: &StoreUpdate) -> (&'static str, Value) {
    match update {
        StoreUpdate::StateChanged { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": &**state
            }),
        ),
        StoreUpdate::AchievementUnlocked { achievement_id } => {
            let achievement = crate::catalog::achievement(achievement_id);
            (
                "achievement_unlocked",
                json!({
                    "type": "achievement_unlocked",
                    "achievement_id": achievement_id,
                    "achievement": achievement
                }),
            )
        }
        StoreUpdate::Rejected { reason } => (
            "rejected",
            json!({
                "type": "rejected",
                "reason": reason
            }),
        ),
    }
}
