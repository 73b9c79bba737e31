//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the store runtime with mock implementations.

use crate::catalog::{Mood, Persona};
use crate::db::Database;
use crate::generation::{FragmentStream, GenerationClient, GenerationError};
use crate::store::state::ChatMessage;
use crate::store::PersistedSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable home of the store's snapshot
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored snapshot
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), String>;

    /// Read the stored snapshot, if one was ever written
    async fn load(&self) -> Result<Option<PersistedSnapshot>, String>;

    /// Keep an unreadable snapshot out of the way of the next save
    async fn set_aside(&self) -> Result<(), String>;
}

/// Source of the current time
///
/// Streaks, challenges and journal timestamps all read "now" through this.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), String> {
        (**self).save(snapshot).await
    }

    async fn load(&self) -> Result<Option<PersistedSnapshot>, String> {
        (**self).load().await
    }

    async fn set_aside(&self) -> Result<(), String> {
        (**self).set_aside().await
    }
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn stream_reply(
        &self,
        persona: &Persona,
        mood: Option<&Mood>,
        history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError> {
        (**self).stream_reply(persona, mood, history).await
    }

    async fn welcome_message(
        &self,
        persona: &Persona,
        mood: &Mood,
    ) -> Result<String, GenerationError> {
        (**self).welcome_message(persona, mood).await
    }

    async fn chat_summary(
        &self,
        persona_name: &str,
        history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        (**self).chat_summary(persona_name, history).await
    }

    async fn daily_challenge(&self) -> Result<String, GenerationError> {
        (**self).daily_challenge().await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `SnapshotStore`
#[derive(Clone)]
pub struct DatabaseSnapshotStore {
    db: Database,
    name: String,
}

impl DatabaseSnapshotStore {
    pub fn new(db: Database, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SnapshotStore for DatabaseSnapshotStore {
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), String> {
        self.db
            .save_snapshot(&self.name, snapshot)
            .map_err(|e| e.to_string())
    }

    async fn load(&self) -> Result<Option<PersistedSnapshot>, String> {
        if let Ok(Some(written)) = self.db.snapshot_updated_at(&self.name) {
            tracing::info!(name = %self.name, written = %written, "Loading snapshot");
        }
        self.db.load_snapshot(&self.name).map_err(|e| e.to_string())
    }

    async fn set_aside(&self) -> Result<(), String> {
        let aside = self
            .db
            .set_aside_snapshot(&self.name)
            .map_err(|e| e.to_string())?;
        tracing::warn!(name = %self.name, aside = %aside, "Set aside unreadable snapshot");
        Ok(())
    }
}

/// Wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
