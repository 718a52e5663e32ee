//! Request and response bodies of the ingestion endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AlarmSeverity, CurrentWork, DispatchReport, MachineStatus, OperationStatus};
use crate::service::StatusRecorded;

/// `POST /machines/{id}/status` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordStatusRequest {
    /// Reported operating state.
    pub status: MachineStatus,
    /// Utilization in percent; clamped to `[0, 100]`.
    #[serde(default)]
    pub utilization_percent: f64,
    /// Spindle load, if reported.
    #[serde(default)]
    pub spindle_load: Option<f64>,
    /// Feed rate, if reported.
    #[serde(default)]
    pub feed_rate: Option<f64>,
    /// Work currently running on the machine.
    #[serde(default)]
    pub current_work: Option<CurrentWork>,
    /// Capture time; defaults to the time of receipt.
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

/// `POST /machines/{id}/alarms` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct RaiseAlarmRequest {
    /// Controller alarm code.
    pub alarm_code: String,
    /// Alarm severity.
    pub severity: AlarmSeverity,
    /// Controller alarm text.
    #[serde(default)]
    pub message: String,
}

/// `POST /jobs/{id}/operations/{op}/progress` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationProgressRequest {
    /// New state of the operation.
    pub status: OperationStatus,
}

/// Fan-out outcome returned by the alarm and operation-progress
/// endpoints, which only broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAck {
    /// Connections subscribed to at least one matching topic.
    pub targeted: usize,
    /// Connections the event was queued for.
    pub delivered: usize,
    /// Connections skipped because their queue was full.
    pub dropped: usize,
}

impl From<DispatchReport> for DispatchAck {
    fn from(report: DispatchReport) -> Self {
        Self {
            targeted: report.targeted,
            delivered: report.delivered,
            dropped: report.dropped,
        }
    }
}

/// `POST /machines/{id}/status` response: the cache write outcome plus
/// the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    /// Whether the status map was updated in the cache.
    pub cached: bool,
    /// Fan-out of the status event.
    #[serde(flatten)]
    pub dispatch: DispatchAck,
}

impl From<StatusRecorded> for IngestAck {
    fn from(recorded: StatusRecorded) -> Self {
        Self {
            cached: recorded.cached,
            dispatch: recorded.dispatch.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ack_is_flat() {
        let ack = IngestAck::from(StatusRecorded {
            cached: false,
            dispatch: DispatchReport {
                targeted: 2,
                delivered: 1,
                dropped: 1,
                stale: 0,
            },
        });
        let json = serde_json::to_value(ack).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"cached": false, "targeted": 2, "delivered": 1, "dropped": 1})
        );
    }

    #[test]
    fn dispatch_ack_has_no_cache_flag() {
        let json = serde_json::to_value(DispatchAck::from(DispatchReport::default()))
            .unwrap_or_default();
        assert!(json.get("cached").is_none());
        assert_eq!(json.get("delivered"), Some(&serde_json::json!(0)));
    }
}
