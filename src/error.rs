//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Entities that simply do not exist are reported by the services as
//! `Ok(None)`; the handlers turn that into the matching `*NotFound`
//! variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::{DepartmentId, JobId, MachineId, OperationId, TopicParseError};
use crate::metadata::MetadataError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "machine not found: 1b4e28ba-2fa1-11d2-883f-0016d3cca427",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code, see [`GatewayError`].
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Not Found       | 404 Not Found                |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Department with the given ID was not found.
    #[error("department not found: {0}")]
    DepartmentNotFound(DepartmentId),

    /// Machine with the given ID was not found.
    #[error("machine not found: {0}")]
    MachineNotFound(MachineId),

    /// Job routing with the given ID was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// No NPI workflow exists for the given job.
    #[error("NPI workflow for job {0} not found")]
    WorkflowNotFound(JobId),

    /// The job exists but has no such operation.
    #[error("operation {operation_id} not found in job {job_id}")]
    OperationNotFound {
        /// Job that was searched.
        job_id: JobId,
        /// Operation that was asked for.
        operation_id: OperationId,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A subscription topic could not be parsed.
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicParseError),

    /// The metadata store failed while loading an entity.
    #[error("failed to load {entity} {id}: {source}")]
    Infrastructure {
        /// Kind of entity being loaded, e.g. `"department"`.
        entity: &'static str,
        /// Identifier being loaded, `"*"` for listings.
        id: String,
        /// Underlying backend failure.
        #[source]
        source: MetadataError,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Wraps a metadata failure with the entity it concerned.
    #[must_use]
    pub fn infrastructure(
        entity: &'static str,
        id: impl std::fmt::Display,
        source: MetadataError,
    ) -> Self {
        Self::Infrastructure {
            entity,
            id: id.to_string(),
            source,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidTopic(_) => 1002,
            Self::DepartmentNotFound(_) => 2001,
            Self::MachineNotFound(_) => 2002,
            Self::JobNotFound(_) => 2003,
            Self::WorkflowNotFound(_) => 2004,
            Self::OperationNotFound { .. } => 2005,
            Self::Internal(_) => 3000,
            Self::Infrastructure { .. } => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidTopic(_) => StatusCode::BAD_REQUEST,
            Self::DepartmentNotFound(_)
            | Self::MachineNotFound(_)
            | Self::JobNotFound(_)
            | Self::WorkflowNotFound(_)
            | Self::OperationNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Infrastructure { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
