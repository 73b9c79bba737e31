//! Fadfada - mood-support chat companion
//!
//! A Rust backend implementing the app store as a pure state machine with
//! streamed AI replies, snapshot persistence and gamification.

mod api;
mod catalog;
mod config;
mod db;
mod generation;
mod runtime;
mod store;

use api::{create_router, ApiState};
use config::AppConfig;
use db::Database;
use generation::{GeminiClient, GenerationClient, LoggingClient, UnavailableClient};
use runtime::{restore_state, DatabaseSnapshotStore, Restored, StoreRuntime, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use store::StoreContext;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fadfada=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    let snapshots = DatabaseSnapshotStore::new(db, config.snapshot_name.clone());

    // Restore the last snapshot; an unreadable one is set aside, not overwritten
    let Restored { state, source } = restore_state(&snapshots).await;
    tracing::info!(source = ?source, "Store state ready");

    // Generation client
    let inner: Arc<dyn GenerationClient> = match &config.gemini.api_key {
        Some(key) => Arc::new(GeminiClient::new(
            key.clone(),
            config.gemini.model.clone(),
            &config.gemini.base_url,
        )?),
        None => {
            tracing::warn!("No generation API key configured. Set GEMINI_API_KEY.");
            Arc::new(UnavailableClient)
        }
    };
    let generation = LoggingClient::new(inner);
    let model = generation.model_id().to_string();

    // Start the store
    let (runtime, handle) = StoreRuntime::new(
        StoreContext::new(config.profile.clone()),
        state,
        generation,
        snapshots,
        SystemClock,
    );
    tokio::spawn(runtime.run());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(ApiState::new(handle, model))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Fadfada server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
