//! Metadata collaborator: read-only access to departments, machines and
//! job routings.
//!
//! The gateway never writes entity metadata; it fetches a fresh snapshot
//! per request through [`MetadataStore`]. Two backends are provided: an
//! in-memory store seeded from JSON, and a PostgreSQL reader built on
//! `sqlx`.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

pub use memory::{InMemoryMetadataStore, MetadataSeed};
pub use postgres::PostgresMetadataStore;

use crate::domain::{Department, DepartmentId, JobId, JobRouting, Machine, MachineId};

/// Errors raised by a metadata backend.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The backend failed or returned data it could not decode.
    #[error("metadata backend failure: {0}")]
    Backend(String),

    /// A seed file could not be read or parsed.
    #[error("metadata seed error: {0}")]
    Seed(String),
}

impl From<sqlx::Error> for MetadataError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Read-only view of the entity metadata.
///
/// Lookups return `Ok(None)` when the entity does not exist; `Err` is
/// reserved for backend failures.
#[async_trait]
pub trait MetadataStore: Send + Sync + fmt::Debug {
    /// Returns every department with all of its machines.
    async fn list_departments(&self) -> Result<Vec<Department>, MetadataError>;

    /// Returns one department with all of its machines.
    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, MetadataError>;

    /// Returns every machine, active or not.
    async fn list_machines(&self) -> Result<Vec<Machine>, MetadataError>;

    /// Returns one machine.
    async fn machine(&self, id: MachineId) -> Result<Option<Machine>, MetadataError>;

    /// Returns every job routing with its operations.
    async fn list_jobs(&self) -> Result<Vec<JobRouting>, MetadataError>;

    /// Returns one job routing with its operations.
    async fn job(&self, id: JobId) -> Result<Option<JobRouting>, MetadataError>;
}
