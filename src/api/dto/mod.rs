//! Data Transfer Objects for REST request/response serialization.
//!
//! Response bodies are the domain read models, re-exported here under
//! the API surface; this module adds the request bodies, query strings
//! and ingestion acknowledgements.

pub mod ingest_dto;
pub mod job_dto;

pub use crate::domain::view::{
    DepartmentMetrics, DepartmentView, JobProgress, JobRoutingView, MachineLocation, MachineView,
    WorkflowStep, WorkflowTimeline, WorkflowVisualization,
};
pub use ingest_dto::*;
pub use job_dto::*;
