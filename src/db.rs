//! Database module for Fadfada
//!
//! Persists the store's snapshot as a single named JSON blob.

mod schema;

use schema::{MIGRATION_SNAPSHOT_VERSION, SCHEMA};

use crate::store::{PersistedSnapshot, SNAPSHOT_VERSION};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Snapshot version {found} is newer than supported version {}", SNAPSHOT_VERSION)]
    UnsupportedVersion { found: u32 },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;

        // Add version column - ignore error if it already exists
        let _ = conn.execute(MIGRATION_SNAPSHOT_VERSION, []);

        Ok(())
    }

    // ==================== Snapshot Operations ====================

    /// Write the snapshot under `name`, replacing any previous one
    pub fn save_snapshot(&self, name: &str, snapshot: &PersistedSnapshot) -> DbResult<()> {
        let data = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO snapshots (name, version, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                version = excluded.version,
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![name, snapshot.version, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read the snapshot stored under `name`
    ///
    /// Rows from a newer build are refused rather than half-read.
    pub fn load_snapshot(&self, name: &str) -> DbResult<Option<PersistedSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(u32, String)> = conn
            .query_row(
                "SELECT version, data FROM snapshots WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let Some((column_version, data)) = row else {
            return Ok(None);
        };
        if column_version > SNAPSHOT_VERSION {
            return Err(DbError::UnsupportedVersion {
                found: column_version,
            });
        }

        let snapshot = PersistedSnapshot::from_json(&data)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(DbError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        Ok(Some(snapshot))
    }

    /// Move the row under `name` out of the way, keeping its data
    ///
    /// Returns the name it now lives under.
    pub fn set_aside_snapshot(&self, name: &str) -> DbResult<String> {
        let conn = self.conn.lock().unwrap();
        let aside = format!("{name}.unreadable-{}", Utc::now().timestamp_millis());
        conn.execute(
            "UPDATE snapshots SET name = ?2 WHERE name = ?1",
            params![name, aside],
        )?;
        Ok(aside)
    }

    /// When the snapshot under `name` was last written
    pub fn snapshot_updated_at(&self, name: &str) -> DbResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let updated: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated.map(|s| parse_datetime(&s)))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
