//! Job routing handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::JobListQuery;
use crate::app_state::AppState;
use crate::domain::JobId;
use crate::error::GatewayError;

/// `GET /jobs?status=` — Job routings, optionally filtered by status.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an unknown status.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.shop_service.list_jobs(status).await?))
}

/// `GET /jobs/active` — Released and in-progress jobs by priority.
///
/// # Errors
///
/// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
pub async fn list_active_jobs(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.shop_service.active_jobs().await?))
}

/// `GET /jobs/{id}` — One job routing.
///
/// # Errors
///
/// Returns [`GatewayError::JobNotFound`] if the job does not exist.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = JobId::from_uuid(id);
    state
        .shop_service
        .job(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::JobNotFound(id))
}

/// Job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/active", get(list_active_jobs))
        .route("/jobs/{id}", get(get_job))
}
