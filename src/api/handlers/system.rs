//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    connections: usize,
}

/// `GET /health` — Service health status and live connection count.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.dispatcher.connection_count().await,
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
