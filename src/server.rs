//! HTTP API routes.

use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = if state.dispatcher.store().is_healthy().await {
        "up"
    } else {
        "down"
    };
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cryptogame",
        "store": store,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub requester: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub text: String,
    pub request_id: String,
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, AppError> {
    let request_id = Uuid::new_v4().to_string();
    log::info!("Received request: {request_id}");

    if request.requester.trim().is_empty() {
        return Err(AppError::InvalidRequest("requester must not be empty".to_string()));
    }

    let text = state
        .dispatcher
        .handle(request.requester.trim(), &request.text)
        .await;
    log::debug!("Request {request_id} answered ({} chars)", text.len());

    Ok(Json(ExecuteResponse { text, request_id }))
}
