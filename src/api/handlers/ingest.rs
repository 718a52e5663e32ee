//! Ingestion hooks: telemetry producers push status, alarms and
//! operation progress here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    DispatchAck, IngestAck, OperationProgressRequest, RaiseAlarmRequest, RecordStatusRequest,
};
use crate::app_state::AppState;
use crate::domain::{JobId, MachineId, MachineStatusSnapshot, OperationId};
use crate::error::GatewayError;

/// `POST /machines/{id}/status` — Record the latest status of a machine.
///
/// # Errors
///
/// Never fails once the body is parsed; cache failures are reported via
/// `cached: false`.
pub async fn record_status(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RecordStatusRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let machine_id = MachineId::from_uuid(id);
    let snapshot = MachineStatusSnapshot::new(
        machine_id,
        req.status,
        req.utilization_percent,
        req.captured_at.unwrap_or_else(Utc::now),
    )
    .with_spindle_load(req.spindle_load)
    .with_feed_rate(req.feed_rate)
    .with_current_work(req.current_work);

    let recorded = state
        .telemetry_service
        .record_status(machine_id, snapshot)
        .await;
    Ok((StatusCode::ACCEPTED, Json(IngestAck::from(recorded))))
}

/// `POST /machines/{id}/alarms` — Broadcast a machine alarm.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the alarm code is empty.
pub async fn raise_alarm(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RaiseAlarmRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if req.alarm_code.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "alarm_code must not be empty".to_string(),
        ));
    }
    let report = state
        .telemetry_service
        .raise_alarm(
            MachineId::from_uuid(id),
            req.alarm_code,
            req.severity,
            req.message,
        )
        .await;
    Ok((StatusCode::ACCEPTED, Json(DispatchAck::from(report))))
}

/// `POST /jobs/{id}/operations/{op}/progress` — Broadcast an operation
/// state change.
///
/// # Errors
///
/// Returns [`GatewayError::JobNotFound`] or
/// [`GatewayError::OperationNotFound`] if either does not exist.
pub async fn report_operation_progress(
    State(state): State<AppState>,
    Path((job_id, operation_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(req): Json<OperationProgressRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let job_id = JobId::from_uuid(job_id);
    let operation_id = OperationId::from_uuid(operation_id);
    let report = state
        .telemetry_service
        .report_operation_progress(job_id, operation_id, req.status)
        .await?;
    match report {
        Some(report) => Ok((StatusCode::ACCEPTED, Json(DispatchAck::from(report)))),
        None if state.shop_service.job(job_id).await?.is_none() => {
            Err(GatewayError::JobNotFound(job_id))
        }
        None => Err(GatewayError::OperationNotFound {
            job_id,
            operation_id,
        }),
    }
}

/// Ingestion routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/machines/{id}/status", post(record_status))
        .route("/machines/{id}/alarms", post(raise_alarm))
        .route(
            "/jobs/{id}/operations/{op}/progress",
            post(report_operation_progress),
        )
}
