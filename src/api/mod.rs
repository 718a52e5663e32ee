//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health` and the
//! WebSocket endpoint `/ws` live at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Upper bound on a single REST request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds the full application: REST, WebSocket, tracing and CORS layers.
///
/// The request timeout applies to REST routes only; `/ws` connections are
/// long-lived.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router().layer(TimeoutLayer::new(REQUEST_TIMEOUT)))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
