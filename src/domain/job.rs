//! Job routings and their ordered operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DepartmentId, DepartmentType, JobId, MachineId, OperationId};

/// Category of a job routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// New product introduction. Only these jobs get a workflow view.
    Npi,
    /// Repeat production.
    Production,
    /// Rework of rejected parts.
    Rework,
    /// One-off prototype.
    Prototype,
}

/// Lifecycle state of a job routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Entered but not yet released to the floor.
    Created,
    /// Released and waiting for its first operation.
    Released,
    /// At least one operation started.
    InProgress,
    /// Held by planning or quality.
    OnHold,
    /// All work finished.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl JobStatus {
    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Released => "released",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// Parses case-insensitively; underscores are optional so both
    /// `in_progress` and `InProgress` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "released" => Ok(Self::Released),
            "inprogress" => Ok(Self::InProgress),
            "onhold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

/// State of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Not started.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
    /// Not performed for this job.
    Skipped,
}

/// Department an operation is routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRef {
    /// Department identifier.
    pub id: DepartmentId,
    /// Department name.
    pub name: String,
    /// Department type.
    pub department_type: DepartmentType,
}

/// Machine an operation is scheduled on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRef {
    /// Machine identifier.
    pub id: MachineId,
    /// Machine name.
    pub name: String,
}

/// One step of a job routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier.
    pub id: OperationId,
    /// Position within the routing; lower runs first.
    pub sequence: i32,
    /// Short operation code, e.g. `"OP10"`.
    pub operation_code: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Department the operation is routed to.
    pub department: DepartmentRef,
    /// Machine the operation is scheduled on, if any.
    #[serde(default)]
    pub machine: Option<MachineRef>,
    /// Estimated setup time in hours.
    #[serde(default)]
    pub estimated_setup_hours: f64,
    /// Estimated cycle time in hours.
    #[serde(default)]
    pub estimated_cycle_hours: f64,
    /// Recorded setup time in hours.
    #[serde(default)]
    pub actual_setup_hours: Option<f64>,
    /// Recorded cycle time in hours.
    #[serde(default)]
    pub actual_cycle_hours: Option<f64>,
    /// Current state.
    #[serde(default)]
    pub status: OperationStatus,
    /// When work started.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When work finished.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// Estimated setup plus cycle hours.
    #[must_use]
    pub fn estimated_total_hours(&self) -> f64 {
        self.estimated_setup_hours + self.estimated_cycle_hours
    }

    /// Recorded setup plus cycle hours, or `None` when nothing was recorded.
    #[must_use]
    pub fn actual_total_hours(&self) -> Option<f64> {
        match (self.actual_setup_hours, self.actual_cycle_hours) {
            (None, None) => None,
            (setup, cycle) => Some(setup.unwrap_or(0.0) + cycle.unwrap_or(0.0)),
        }
    }
}

/// A work order routed through one or more departments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRouting {
    /// Job identifier.
    pub id: JobId,
    /// Human-facing job number.
    pub job_number: String,
    /// Part being produced.
    pub part_number: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered quantity.
    pub quantity: u32,
    /// Quantity finished so far.
    #[serde(default)]
    pub quantity_completed: u32,
    /// Scheduling priority; lower is more urgent.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Job category.
    pub job_type: JobType,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Promised delivery date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// When the job was finished.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Planned total hours for the whole job.
    #[serde(default)]
    pub estimated_total_hours: Option<f64>,
    /// Booked total hours for the whole job.
    #[serde(default)]
    pub actual_total_hours: Option<f64>,
    /// Operations in storage order; see [`JobRouting::ordered_operations`].
    #[serde(default)]
    pub operations: Vec<Operation>,
}

const fn default_priority() -> i32 {
    5
}

impl JobRouting {
    /// Operations sorted by sequence number.
    #[must_use]
    pub fn ordered_operations(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.operations.iter().collect();
        ops.sort_by_key(|op| op.sequence);
        ops
    }

    /// `true` for jobs released to the floor or already in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, JobStatus::Released | JobStatus::InProgress)
    }

    /// `true` for new product introduction jobs.
    #[must_use]
    pub const fn is_npi(&self) -> bool {
        matches!(self.job_type, JobType::Npi)
    }

    /// Looks up an operation by id.
    #[must_use]
    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_parses_loosely() {
        assert_eq!("InProgress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!("in_progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!("RELEASED".parse::<JobStatus>(), Ok(JobStatus::Released));
        assert!("shipped".parse::<JobStatus>().is_err());
    }

    #[test]
    fn actual_hours_absent_until_recorded() {
        let mut op = Operation {
            id: OperationId::new(),
            sequence: 10,
            operation_code: "OP10".to_string(),
            description: None,
            department: DepartmentRef {
                id: DepartmentId::new(),
                name: "Mill".to_string(),
                department_type: DepartmentType::CncMill,
            },
            machine: None,
            estimated_setup_hours: 1.0,
            estimated_cycle_hours: 2.5,
            actual_setup_hours: None,
            actual_cycle_hours: None,
            status: OperationStatus::Pending,
            started_at: None,
            completed_at: None,
        };
        assert!((op.estimated_total_hours() - 3.5).abs() < f64::EPSILON);
        assert_eq!(op.actual_total_hours(), None);

        op.actual_setup_hours = Some(1.5);
        assert_eq!(op.actual_total_hours(), Some(1.5));
    }
}
