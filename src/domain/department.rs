//! Departments: physical work areas on the shop floor.

use serde::{Deserialize, Serialize};

use super::machine::default_true;
use super::{DepartmentId, Machine};

/// Kind of work performed in a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentType {
    /// CNC milling.
    CncMill,
    /// CNC turning.
    CncLathe,
    /// CAM programming.
    Programming,
    /// Material cutting.
    Saw,
    /// Shipping and receiving dock.
    ShippingReceiving,
    /// Deburring.
    Deburr,
    /// Parts cleaning.
    PartsCleaning,
    /// Front office.
    FrontOffice,
    /// Tool crib.
    ToolCrib,
}

/// Footprint of a department in the visualization's world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepartmentLayout {
    /// Extent along X.
    pub size_x: f64,
    /// Extent along Y.
    pub size_y: f64,
    /// Extent along Z.
    pub size_z: f64,
    /// Origin X.
    pub position_x: f64,
    /// Origin Y.
    pub position_y: f64,
    /// Origin Z.
    pub position_z: f64,
    /// Rotation around the vertical axis, in degrees.
    pub rotation: f64,
}

impl Default for DepartmentLayout {
    fn default() -> Self {
        Self {
            size_x: 10.0,
            size_y: 10.0,
            size_z: 3.0,
            position_x: 0.0,
            position_y: 0.0,
            position_z: 0.0,
            rotation: 0.0,
        }
    }
}

/// Department metadata together with the machines it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    /// Department identifier.
    pub id: DepartmentId,
    /// Display name.
    pub name: String,
    /// Kind of work performed.
    pub department_type: DepartmentType,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Physical layout.
    #[serde(default)]
    pub layout: DepartmentLayout,
    /// Inactive departments are hidden from listings.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Machines located in this department, active or not.
    #[serde(default)]
    pub machines: Vec<Machine>,
}

impl Department {
    /// Iterates over the machines marked active.
    pub fn active_machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.iter().filter(|m| m.is_active)
    }
}
