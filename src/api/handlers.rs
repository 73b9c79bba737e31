//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ActionResponse, CatalogResponse, ErrorResponse, ModelResponse};
use super::ApiState;
use crate::catalog;
use crate::runtime::StoreError;
use crate::store::{Action, AppState, TransitionError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Store state
        .route("/api/state", get(get_state))
        .route("/api/actions", post(dispatch_action))
        // SSE streaming
        .route("/api/stream", get(stream_updates))
        // Static catalogs
        .route("/api/catalog", get(get_catalog))
        .route("/api/model", get(get_model))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Store State
// ============================================================

async fn get_state(State(state): State<ApiState>) -> Json<AppState> {
    Json(AppState::clone(&state.store.snapshot()))
}

async fn dispatch_action(
    State(state): State<ApiState>,
    Json(action): Json<Action>,
) -> Result<Json<ActionResponse>, AppError> {
    tracing::debug!(action = ?action, "Dispatching action");
    state.store.dispatch(action).await?;

    Ok(Json(ActionResponse {
        ok: true,
        state: AppState::clone(&state.store.snapshot()),
    }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_updates(State(state): State<ApiState>) -> impl IntoResponse {
    // Subscribe before reading the snapshot so nothing falls in between
    let updates_rx = state.store.subscribe();
    sse_stream(state.store.snapshot(), updates_rx)
}

// ============================================================
// Catalogs
// ============================================================

async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        personas: catalog::all_personas(),
        moods: catalog::all_moods(),
        achievements: catalog::all_achievements(),
        themes: catalog::all_themes(),
    })
}

async fn get_model(State(state): State<ApiState>) -> Json<ModelResponse> {
    Json(ModelResponse {
        model: state.model.clone(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("fadfada ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(super) enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::Stopped => AppError::Unavailable(message),
            StoreError::Rejected(rejection) => match rejection {
                TransitionError::NotFound(_) | TransitionError::UnknownCatalogId(_) => {
                    AppError::NotFound(message)
                }
                TransitionError::Busy | TransitionError::InvalidTransition(_) => {
                    AppError::Conflict(message)
                }
                TransitionError::NoPersonaSelected
                | TransitionError::EmptyMessage
                | TransitionError::ChatTooShort
                | TransitionError::InvalidSetting(_) => AppError::BadRequest(message),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
