//! Department handlers: list, detail, live metrics.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::DepartmentId;
use crate::error::GatewayError;

/// `GET /departments` — Active departments with metrics and machines.
///
/// # Errors
///
/// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.shop_service.list_departments().await?))
}

/// `GET /departments/{id}` — One department.
///
/// # Errors
///
/// Returns [`GatewayError::DepartmentNotFound`] if the department does not
/// exist.
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = DepartmentId::from_uuid(id);
    state
        .shop_service
        .department(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::DepartmentNotFound(id))
}

/// `GET /departments/{id}/metrics` — Live metrics of one department.
///
/// # Errors
///
/// Returns [`GatewayError::DepartmentNotFound`] if the department does not
/// exist.
pub async fn get_department_metrics(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = DepartmentId::from_uuid(id);
    state
        .shop_service
        .department_metrics(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::DepartmentNotFound(id))
}

/// Department routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/departments", get(list_departments))
        .route("/departments/{id}", get(get_department))
        .route("/departments/{id}/metrics", get(get_department_metrics))
}
