//! Environment-driven configuration

use crate::store::state::User;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SNAPSHOT_NAME: &str = "fadfada-app-state";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime configuration for the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub snapshot_name: String,
    pub gemini: GeminiConfig,
    /// Profile installed by the mock login
    pub profile: User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Generation is disabled when unset
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = var("FADFADA_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".fadfada").join("fadfada.db")
            },
            PathBuf::from,
        );

        let port = match var("FADFADA_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid FADFADA_PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            db_path,
            port,
            snapshot_name: var("FADFADA_SNAPSHOT_NAME")
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_NAME.to_string()),
            gemini: GeminiConfig {
                api_key: var("GEMINI_API_KEY"),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: var("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            profile: User {
                id: "1".to_string(),
                name: var("FADFADA_USER_NAME").unwrap_or_else(|| "Diana".to_string()),
                email: var("FADFADA_USER_EMAIL")
                    .unwrap_or_else(|| "diana@example.com".to_string()),
            },
        }
    }
}
