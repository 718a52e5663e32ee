//! NPI workflow handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::JobId;
use crate::error::GatewayError;

/// `GET /workflows/npi/{job_id}` — Workflow view of one NPI job.
///
/// # Errors
///
/// Returns [`GatewayError::WorkflowNotFound`] if the job does not exist or
/// is not an NPI job.
pub async fn get_npi_workflow(
    State(state): State<AppState>,
    Path(job_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let job_id = JobId::from_uuid(job_id);
    state
        .shop_service
        .npi_workflow(job_id)
        .await?
        .map(Json)
        .ok_or(GatewayError::WorkflowNotFound(job_id))
}

/// `GET /workflows/npi/active` — Workflow views of active NPI jobs.
///
/// # Errors
///
/// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
pub async fn list_active_npi_workflows(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.shop_service.active_npi_workflows().await?))
}

/// Workflow routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workflows/npi/active", get(list_active_npi_workflows))
        .route("/workflows/npi/{job_id}", get(get_npi_workflow))
}
