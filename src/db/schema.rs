//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS snapshots (
    name TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Tables created before snapshots were versioned lack this column; rows
/// written then are layout 0.
pub const MIGRATION_SNAPSHOT_VERSION: &str =
    "ALTER TABLE snapshots ADD COLUMN version INTEGER NOT NULL DEFAULT 0";
