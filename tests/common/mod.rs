//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use shopfloor_gateway::app_state::AppState;
use shopfloor_gateway::cache::{CacheStore, InMemoryCache};
use shopfloor_gateway::config::GatewayConfig;
use shopfloor_gateway::domain::{
    Department, DepartmentId, DepartmentLayout, DepartmentRef, DepartmentType, JobId, JobRouting,
    JobStatus, JobType, Machine, MachineId, MachineType, Operation, OperationId, OperationStatus,
};
use shopfloor_gateway::metadata::{InMemoryMetadataStore, MetadataSeed, MetadataStore};

/// A small shop: one mill department with two machines and one NPI job.
#[derive(Debug)]
pub struct Fixture {
    /// Wired application state.
    pub state: AppState,
    /// Mill department.
    pub mill: DepartmentId,
    /// Machine that never reports status.
    pub m1: MachineId,
    /// Second mill machine.
    pub m2: MachineId,
    /// NPI job with four operations, two completed.
    pub j1: JobId,
    /// Operations of `j1`, in sequence order.
    pub j1_ops: Vec<OperationId>,
}

fn machine(department_id: DepartmentId, name: &str) -> Machine {
    Machine {
        id: MachineId::new(),
        department_id,
        name: name.to_string(),
        machine_type: MachineType::ThreeAxisMill,
        model: Some("VF-2".to_string()),
        manufacturer: Some("Haas".to_string()),
        position: Default::default(),
        rotation: 0.0,
        capabilities: Default::default(),
        is_active: true,
    }
}

fn operation(sequence: i32, status: OperationStatus, department: DepartmentId) -> Operation {
    Operation {
        id: OperationId::new(),
        sequence,
        operation_code: format!("OP{sequence}"),
        description: None,
        department: DepartmentRef {
            id: department,
            name: "Mill".to_string(),
            department_type: DepartmentType::CncMill,
        },
        machine: None,
        estimated_setup_hours: 0.5,
        estimated_cycle_hours: 1.5,
        actual_setup_hours: None,
        actual_cycle_hours: None,
        status,
        started_at: None,
        completed_at: None,
    }
}

/// Builds the fixture over an in-memory metadata store and cache.
pub fn shop() -> Fixture {
    let mill = DepartmentId::new();
    let m1 = machine(mill, "VF-2 #1");
    let m2 = machine(mill, "VF-2 #2");
    let (m1_id, m2_id) = (m1.id, m2.id);

    let operations = vec![
        operation(10, OperationStatus::Completed, mill),
        operation(20, OperationStatus::Completed, mill),
        operation(30, OperationStatus::InProgress, mill),
        operation(40, OperationStatus::Pending, mill),
    ];
    let j1_ops = operations.iter().map(|op| op.id).collect();
    let j1 = JobRouting {
        id: JobId::new(),
        job_number: "J-1001".to_string(),
        part_number: "BRKT-7".to_string(),
        description: Some("Bracket first article".to_string()),
        quantity: 2,
        quantity_completed: 0,
        priority: 1,
        job_type: JobType::Npi,
        status: JobStatus::InProgress,
        due_date: None,
        completed_at: None,
        estimated_total_hours: None,
        actual_total_hours: None,
        operations,
    };
    let j1_id = j1.id;

    let seed = MetadataSeed {
        departments: vec![Department {
            id: mill,
            name: "Mill".to_string(),
            department_type: DepartmentType::CncMill,
            description: None,
            layout: DepartmentLayout {
                size_x: 20.0,
                size_y: 10.0,
                size_z: 4.0,
                position_x: 0.0,
                position_y: 0.0,
                position_z: 0.0,
                rotation: 0.0,
            },
            is_active: true,
            machines: vec![m1, m2],
        }],
        jobs: vec![j1],
    };

    let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::from_seed(seed));
    let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
    let state = AppState::new(&GatewayConfig::default(), metadata, cache);

    Fixture {
        state,
        mill,
        m1: m1_id,
        m2: m2_id,
        j1: j1_id,
        j1_ops,
    }
}
