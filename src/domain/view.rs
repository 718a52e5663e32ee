//! Read models served to clients.
//!
//! Built by the services from entity metadata and the live status map.
//! Department views also derive `Deserialize`: they are stored in the
//! response cache and read back on the next request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    DepartmentId, DepartmentLayout, DepartmentType, JobId, JobStatus, JobType, MachineCapabilities,
    MachineId, MachineStatusSnapshot, MachineType, Operation, OperationId, OperationStatus,
    Position,
};

// ── Departments ─────────────────────────────────────────────────────────

/// Live metrics for one department.
///
/// Derived on every request from the department's machines, the current
/// status map and the job routings; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentMetrics {
    /// Mean utilization over active machines, 0 when there are none.
    pub average_utilization: f64,
    /// Number of active machines.
    pub machine_count: u32,
    /// Active machines reporting `running`.
    pub running_machines: u32,
    /// Active machines reporting `idle`.
    pub idle_machines: u32,
    /// Active machines reporting `alarm`.
    pub alarm_machines: u32,
    /// Operations in progress in this department.
    pub active_jobs: u32,
    /// Pending operations of released or running jobs in this department.
    pub queued_jobs: u32,
}

/// A department with its layout, live metrics and machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentView {
    /// Department identifier.
    pub id: DepartmentId,
    /// Display name.
    pub name: String,
    /// Kind of work performed.
    pub department_type: DepartmentType,
    /// Free-form description.
    pub description: Option<String>,
    /// Physical layout.
    pub layout: DepartmentLayout,
    /// Live metrics.
    pub metrics: DepartmentMetrics,
    /// Machines with their current status.
    pub machines: Vec<MachineView>,
}

// ── Machines ────────────────────────────────────────────────────────────

/// Where a machine stands on the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineLocation {
    /// Owning department.
    pub department_id: DepartmentId,
    /// Owning department's name, `"Unknown"` if it could not be resolved.
    pub department_name: String,
    /// Position within the department.
    pub position: Position,
    /// Rotation around the vertical axis, in degrees.
    pub rotation: f64,
}

/// A machine with its location and latest status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineView {
    /// Machine identifier.
    pub id: MachineId,
    /// Display name.
    pub name: String,
    /// Kind of machine.
    pub machine_type: MachineType,
    /// Model designation.
    pub model: Option<String>,
    /// Manufacturer name.
    pub manufacturer: Option<String>,
    /// Location on the floor.
    pub location: MachineLocation,
    /// Latest status; offline with zero utilization when none is cached.
    pub status: MachineStatusSnapshot,
    /// Capability data.
    pub capabilities: MachineCapabilities,
}

// ── Jobs ────────────────────────────────────────────────────────────────

/// Progress of a job derived from its operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Completed operations over total operations, in percent.
    pub percent_complete: f64,
    /// Operations with status `completed`.
    pub completed_operations: u32,
    /// All operations of the job.
    pub total_operations: u32,
    /// Planned hours for the whole job.
    pub estimated_total_hours: f64,
    /// Booked hours, absent until something was recorded.
    pub actual_total_hours: Option<f64>,
    /// `max(estimated - actual, 0)`.
    pub hours_remaining: f64,
}

/// A job routing with ordered operations and derived progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRoutingView {
    /// Job identifier.
    pub id: JobId,
    /// Human-facing job number.
    pub job_number: String,
    /// Part being produced.
    pub part_number: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Ordered quantity.
    pub quantity: u32,
    /// Quantity finished so far.
    pub quantity_completed: u32,
    /// Scheduling priority; lower is more urgent.
    pub priority: i32,
    /// Job category.
    pub job_type: JobType,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Promised delivery date.
    pub due_date: Option<DateTime<Utc>>,
    /// Operations in sequence order.
    pub operations: Vec<Operation>,
    /// Derived progress.
    pub progress: JobProgress,
}

// ── Workflows ───────────────────────────────────────────────────────────

/// One operation rendered as a workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Position within the routing.
    pub sequence: i32,
    /// Operation identifier.
    pub operation_id: OperationId,
    /// Operation description, or its code when there is none.
    pub name: String,
    /// Department the step runs in.
    pub department_id: DepartmentId,
    /// Department name.
    pub department_name: String,
    /// Planned hours.
    pub estimated_hours: f64,
    /// Booked hours, if any.
    pub actual_hours: Option<f64>,
    /// Step state.
    pub status: OperationStatus,
    /// When work started.
    pub started_at: Option<DateTime<Utc>>,
    /// When work finished.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Time frame of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTimeline {
    /// Start of the first started step, or the time of the request.
    pub start_time: DateTime<Utc>,
    /// Job completion time.
    pub end_time: Option<DateTime<Utc>>,
    /// Request time plus the hours remaining.
    pub estimated_end_time: DateTime<Utc>,
    /// Planned hours for the whole job.
    pub total_duration_hours: f64,
    /// Booked hours so far.
    pub elapsed_hours: f64,
    /// Hours still planned.
    pub remaining_hours: f64,
}

/// An NPI job laid out as ordered steps on a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVisualization {
    /// Job identifier.
    pub job_id: JobId,
    /// Human-facing job number.
    pub job_number: String,
    /// Part being produced.
    pub part_number: String,
    /// Steps in sequence order.
    pub steps: Vec<WorkflowStep>,
    /// Time frame.
    pub timeline: WorkflowTimeline,
    /// Progress the timeline was derived from.
    pub progress: JobProgress,
}
