//! Server-pushed events.
//!
//! Every state change worth showing live on the shop floor becomes a
//! [`ShopEvent`]. The event decides which topics it belongs to; the
//! [`super::BroadcastDispatcher`] takes care of delivering it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DepartmentId, JobId, MachineId, MachineStatus, OperationId, OperationStatus, Topic};

/// A machine reported a new status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStatusUpdateMessage {
    /// Machine identifier.
    pub machine_id: MachineId,
    /// Machine display name, empty if unknown.
    pub machine_name: String,
    /// Department owning the machine, when known.
    pub department_id: Option<DepartmentId>,
    /// New status.
    pub status: MachineStatus,
    /// Utilization in percent.
    pub utilization_percent: f64,
    /// Spindle load, if reported.
    pub spindle_load: Option<f64>,
    /// Capture time of the sample.
    pub timestamp: DateTime<Utc>,
}

/// An operation of a job changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgressUpdateMessage {
    /// Job identifier.
    pub job_id: JobId,
    /// Human-facing job number.
    pub job_number: String,
    /// Operation that changed.
    pub operation_id: OperationId,
    /// Department the operation is routed to.
    pub department_id: Option<DepartmentId>,
    /// Job percent complete after the change.
    pub percent_complete: f64,
    /// New operation status.
    pub status: OperationStatus,
    /// Time of the change.
    pub timestamp: DateTime<Utc>,
}

/// How urgent an alarm is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmSeverity {
    /// Informational message from the controller.
    Info,
    /// Attention needed soon.
    Warning,
    /// Machine stopped.
    Critical,
}

/// A machine raised an alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEventMessage {
    /// Machine identifier.
    pub machine_id: MachineId,
    /// Machine display name, empty if unknown.
    pub machine_name: String,
    /// Department owning the machine, when known.
    pub department_id: Option<DepartmentId>,
    /// Controller alarm code.
    pub alarm_code: String,
    /// Alarm severity.
    pub severity: AlarmSeverity,
    /// Controller alarm text.
    pub message: String,
    /// Time the alarm was raised.
    pub timestamp: DateTime<Utc>,
}

/// Event pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ShopEvent {
    /// Machine status changed.
    MachineStatusUpdate(MachineStatusUpdateMessage),
    /// Job progress changed.
    JobProgressUpdate(JobProgressUpdateMessage),
    /// Machine alarm raised.
    AlarmEvent(AlarmEventMessage),
}

impl ShopEvent {
    /// Topics this event is delivered to.
    ///
    /// Machine-scoped events target `machine:<id>`, the machine's
    /// department when known, and `shop`. Job progress targets the
    /// operation's department when known, and `shop`. The result is
    /// deterministic and never contains duplicates.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        let (machine, department) = match self {
            Self::MachineStatusUpdate(m) => (Some(m.machine_id), m.department_id),
            Self::AlarmEvent(a) => (Some(a.machine_id), a.department_id),
            Self::JobProgressUpdate(j) => (None, j.department_id),
        };
        let mut topics = Vec::with_capacity(3);
        if let Some(id) = machine {
            topics.push(Topic::Machine(id));
        }
        if let Some(id) = department {
            topics.push(Topic::Department(id));
        }
        topics.push(Topic::Shop);
        topics
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::MachineStatusUpdate(_) => "machine_status_update",
            Self::JobProgressUpdate(_) => "job_progress_update",
            Self::AlarmEvent(_) => "alarm_event",
        }
    }
}
