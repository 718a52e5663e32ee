//! In-memory [`MetadataStore`], seeded from JSON.
//!
//! Used for local runs without a database and throughout the tests.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MetadataError, MetadataStore};
use crate::domain::{Department, DepartmentId, JobId, JobRouting, Machine, MachineId};

/// Seed document for [`InMemoryMetadataStore`].
///
/// ```json
/// { "departments": [ ... ], "jobs": [ ... ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataSeed {
    /// Departments, each embedding its machines.
    #[serde(default)]
    pub departments: Vec<Department>,
    /// Job routings, each embedding its operations.
    #[serde(default)]
    pub jobs: Vec<JobRouting>,
}

/// Metadata held in process memory.
///
/// Listings keep the order of the seed.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    departments: Vec<Department>,
    jobs: Vec<JobRouting>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the seed's entities.
    #[must_use]
    pub fn from_seed(seed: MetadataSeed) -> Self {
        Self {
            departments: seed.departments,
            jobs: seed.jobs,
        }
    }

    /// Loads a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Seed`] if the file cannot be read or is
    /// not a valid [`MetadataSeed`].
    pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MetadataError::Seed(format!("{}: {e}", path.display())))?;
        let seed: MetadataSeed = serde_json::from_str(&raw)
            .map_err(|e| MetadataError::Seed(format!("{}: {e}", path.display())))?;
        tracing::info!(
            path = %path.display(),
            departments = seed.departments.len(),
            jobs = seed.jobs.len(),
            "loaded metadata seed"
        );
        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn list_departments(&self) -> Result<Vec<Department>, MetadataError> {
        Ok(self.departments.clone())
    }

    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, MetadataError> {
        Ok(self
            .departments
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, MetadataError> {
        Ok(self
            .departments
            .iter()
            .flat_map(|d| d.machines.iter().cloned())
            .collect())
    }

    async fn machine(&self, id: MachineId) -> Result<Option<Machine>, MetadataError> {
        Ok(self
            .departments
            .iter()
            .flat_map(|d| d.machines.iter())
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobRouting>, MetadataError> {
        Ok(self.jobs.clone())
    }

    async fn job(&self, id: JobId) -> Result<Option<JobRouting>, MetadataError> {
        Ok(self.jobs.iter().find(|j| j.id == id).cloned())
    }
}
