//! Machine handlers: list, detail, status, per-department listing.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::{DepartmentId, MachineId};
use crate::error::GatewayError;

/// `GET /machines` — Active machines with their current status.
///
/// # Errors
///
/// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
pub async fn list_machines(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.shop_service.list_machines().await?))
}

/// `GET /machines/{id}` — One machine.
///
/// # Errors
///
/// Returns [`GatewayError::MachineNotFound`] if the machine does not exist.
pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = MachineId::from_uuid(id);
    state
        .shop_service
        .machine(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::MachineNotFound(id))
}

/// `GET /machines/{id}/status` — Current status, offline if unknown.
///
/// # Errors
///
/// Returns [`GatewayError::MachineNotFound`] if the machine does not exist.
pub async fn get_machine_status(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = MachineId::from_uuid(id);
    state
        .shop_service
        .machine_status(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::MachineNotFound(id))
}

/// `GET /machines/department/{id}` — Active machines of one department.
///
/// # Errors
///
/// Returns [`GatewayError::DepartmentNotFound`] if the department does not
/// exist.
pub async fn list_department_machines(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = DepartmentId::from_uuid(id);
    state
        .shop_service
        .machines_by_department(id)
        .await?
        .map(Json)
        .ok_or(GatewayError::DepartmentNotFound(id))
}

/// Machine routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/machines", get(list_machines))
        .route("/machines/{id}", get(get_machine))
        .route("/machines/{id}/status", get(get_machine_status))
        .route("/machines/department/{id}", get(list_department_machines))
}
