//! Machines and their live status snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{DepartmentId, JobId, MachineId, OperationId};

/// Operating state reported for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    /// No telemetry, or the machine is powered down.
    #[default]
    Offline,
    /// Powered and ready but not cutting.
    Idle,
    /// Executing a program.
    Running,
    /// Program paused by the operator.
    Paused,
    /// Controller reports an alarm condition.
    Alarm,
    /// Taken out of service for maintenance.
    Maintenance,
}

impl MachineStatus {
    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Alarm => "alarm",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "alarm" => Ok(Self::Alarm),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("unknown machine status: {other}")),
        }
    }
}

/// Job and operation a machine is currently working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWork {
    /// Job being machined.
    pub job_id: JobId,
    /// Operation of that job, when the controller reports it.
    #[serde(default)]
    pub operation_id: Option<OperationId>,
}

/// Latest known status of a single machine.
///
/// The utilization percentage is always within `[0, 100]`: the
/// constructor clamps it and deserialization applies the same rule, so a
/// snapshot read back from the cache upholds the invariant even if a
/// producer wrote an out-of-range value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStatusSnapshot {
    /// Machine this snapshot describes.
    pub machine_id: MachineId,
    /// Reported operating state.
    pub status: MachineStatus,
    #[serde(deserialize_with = "deserialize_percent")]
    utilization_percent: f64,
    /// Spindle load in percent, if the controller reports it.
    #[serde(default)]
    pub spindle_load: Option<f64>,
    /// Feed rate in controller units, if reported.
    #[serde(default)]
    pub feed_rate: Option<f64>,
    /// Work currently running on the machine.
    #[serde(default)]
    pub current_work: Option<CurrentWork>,
    /// When the telemetry sample was captured.
    pub captured_at: DateTime<Utc>,
}

impl MachineStatusSnapshot {
    /// Creates a snapshot, clamping `utilization_percent` to `[0, 100]`.
    #[must_use]
    pub fn new(
        machine_id: MachineId,
        status: MachineStatus,
        utilization_percent: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            machine_id,
            status,
            utilization_percent: clamp_percent(utilization_percent),
            spindle_load: None,
            feed_rate: None,
            current_work: None,
            captured_at,
        }
    }

    /// Snapshot used when nothing is known about a machine.
    #[must_use]
    pub fn offline(machine_id: MachineId, captured_at: DateTime<Utc>) -> Self {
        Self::new(machine_id, MachineStatus::Offline, 0.0, captured_at)
    }

    /// Sets the spindle load, if reported.
    #[must_use]
    pub fn with_spindle_load(mut self, load: Option<f64>) -> Self {
        self.spindle_load = load;
        self
    }

    /// Sets the feed rate, if reported.
    #[must_use]
    pub fn with_feed_rate(mut self, rate: Option<f64>) -> Self {
        self.feed_rate = rate;
        self
    }

    /// Sets the work currently running on the machine, if any.
    #[must_use]
    pub fn with_current_work(mut self, work: Option<CurrentWork>) -> Self {
        self.current_work = work;
        self
    }

    /// Utilization in percent, always within `[0, 100]`.
    #[must_use]
    pub const fn utilization_percent(&self) -> f64 {
        self.utilization_percent
    }
}

/// Clamps a percentage to `[0, 100]`. `NaN` maps to 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_percent)
}

/// Kind of machine tool or workstation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    /// Three-axis vertical mill.
    ThreeAxisMill,
    /// Five-axis mill.
    FiveAxisMill,
    /// Lathe turning center.
    TurningCenter,
    /// Multi-axis lathe.
    MultiAxisLathe,
    /// Band saw.
    BandSaw,
    /// CAM programming workstation.
    CamWorkstation,
    /// Parts washing station.
    WashingStation,
    /// Manual deburr bench.
    DeburrStation,
}

/// Position of an object in the visualization's world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// Static capability data for a machine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineCapabilities {
    /// Maximum spindle speed in RPM.
    #[serde(default)]
    pub max_spindle_speed: Option<u32>,
    /// Maximum feed rate.
    #[serde(default)]
    pub max_feed_rate: Option<f64>,
    /// Number of controlled axes.
    #[serde(default)]
    pub number_of_axes: Option<u32>,
    /// Whether an automatic tool changer is fitted.
    #[serde(default)]
    pub has_tool_changer: bool,
    /// Tool magazine capacity.
    #[serde(default)]
    pub tool_capacity: Option<u32>,
}

/// Machine metadata as supplied by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine identifier.
    pub id: MachineId,
    /// Owning department.
    pub department_id: DepartmentId,
    /// Display name.
    pub name: String,
    /// Kind of machine.
    pub machine_type: MachineType,
    /// Model designation.
    #[serde(default)]
    pub model: Option<String>,
    /// Manufacturer name.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Position within the department.
    #[serde(default)]
    pub position: Position,
    /// Rotation around the vertical axis, in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Capability data.
    #[serde(default)]
    pub capabilities: MachineCapabilities,
    /// Inactive machines are excluded from metrics and listings.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) const fn default_true() -> bool {
    true
}
