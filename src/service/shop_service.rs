//! Shop service: the read side of the gateway.
//!
//! Loads entity metadata, overlays the live status map and builds the
//! read models. Department responses are cached under
//! `departments:all` and `department:<id>`; a cache failure only costs a
//! recomputation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::aggregator::{
    StatusMap, department_metrics_with_jobs, job_progress, status_or_offline, workflow_view,
};
use super::{TelemetryService, metadata_failure};
use crate::cache::{StatusCache, keys};
use crate::domain::{
    Department, DepartmentId, DepartmentMetrics, DepartmentView, JobId, JobRouting,
    JobRoutingView, JobStatus, Machine, MachineId, MachineLocation, MachineStatusSnapshot,
    MachineView, WorkflowVisualization,
};
use crate::error::GatewayError;
use crate::metadata::MetadataStore;

/// Department name shown for machines whose department cannot be found.
const UNKNOWN_DEPARTMENT: &str = "Unknown";

/// TTLs for the cached department responses.
#[derive(Debug, Clone, Copy)]
pub struct ResponseTtls {
    /// `departments:all`.
    pub departments: Duration,
    /// `department:<id>`.
    pub department: Duration,
}

/// Query service over departments, machines, jobs and workflows.
#[derive(Debug)]
pub struct ShopService {
    metadata: Arc<dyn MetadataStore>,
    telemetry: Arc<TelemetryService>,
    cache: StatusCache,
    ttls: ResponseTtls,
}

impl ShopService {
    /// Creates a new `ShopService`.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        telemetry: Arc<TelemetryService>,
        cache: StatusCache,
        ttls: ResponseTtls,
    ) -> Self {
        Self {
            metadata,
            telemetry,
            cache,
            ttls,
        }
    }

    // ── Departments ─────────────────────────────────────────────────────

    /// Every active department with metrics and machines.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn list_departments(&self) -> Result<Vec<DepartmentView>, GatewayError> {
        if let Some(cached) = self.cache.read(keys::DEPARTMENTS_ALL).await {
            return Ok(cached);
        }

        let departments = self
            .metadata
            .list_departments()
            .await
            .map_err(|e| metadata_failure("department", "*", e))?;
        let jobs = self.jobs().await?;
        let statuses = self.telemetry.current_statuses().await;
        let now = Utc::now();

        let views: Vec<DepartmentView> = departments
            .iter()
            .filter(|d| d.is_active)
            .map(|d| department_view(d, &statuses, &jobs, now))
            .collect();

        self.cache
            .write(keys::DEPARTMENTS_ALL, &views, self.ttls.departments)
            .await;
        Ok(views)
    }

    /// One department with metrics and machines.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn department(&self, id: DepartmentId) -> Result<Option<DepartmentView>, GatewayError> {
        let key = keys::department(id);
        if let Some(cached) = self.cache.read(&key).await {
            return Ok(Some(cached));
        }

        let Some(department) = self.load_department(id).await? else {
            return Ok(None);
        };
        let jobs = self.jobs().await?;
        let statuses = self.telemetry.current_statuses().await;
        let view = department_view(&department, &statuses, &jobs, Utc::now());

        self.cache.write(&key, &view, self.ttls.department).await;
        Ok(Some(view))
    }

    /// Live metrics of one department. Never cached.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn department_metrics(
        &self,
        id: DepartmentId,
    ) -> Result<Option<DepartmentMetrics>, GatewayError> {
        let Some(department) = self.load_department(id).await? else {
            return Ok(None);
        };
        let jobs = self.jobs().await?;
        let statuses = self.telemetry.current_statuses().await;
        Ok(Some(department_metrics_with_jobs(
            &department,
            &statuses,
            &jobs,
        )))
    }

    // ── Machines ────────────────────────────────────────────────────────

    /// Every active machine with its current status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn list_machines(&self) -> Result<Vec<MachineView>, GatewayError> {
        let machines = self
            .metadata
            .list_machines()
            .await
            .map_err(|e| metadata_failure("machine", "*", e))?;
        let names: HashMap<DepartmentId, String> = self
            .metadata
            .list_departments()
            .await
            .map_err(|e| metadata_failure("department", "*", e))?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();
        let statuses = self.telemetry.current_statuses().await;
        let now = Utc::now();

        Ok(machines
            .iter()
            .filter(|m| m.is_active)
            .map(|m| {
                let department_name = names
                    .get(&m.department_id)
                    .map_or(UNKNOWN_DEPARTMENT, String::as_str);
                machine_view(m, department_name, &statuses, now)
            })
            .collect())
    }

    /// One machine, active or not, with its current status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn machine(&self, id: MachineId) -> Result<Option<MachineView>, GatewayError> {
        let Some(machine) = self.load_machine(id).await? else {
            return Ok(None);
        };
        let department_name = match self.metadata.department(machine.department_id).await {
            Ok(Some(department)) => department.name,
            Ok(None) => UNKNOWN_DEPARTMENT.to_string(),
            Err(e) => {
                tracing::warn!(
                    machine_id = %id,
                    department_id = %machine.department_id,
                    error = %e,
                    "department lookup failed; reporting it as unknown"
                );
                UNKNOWN_DEPARTMENT.to_string()
            }
        };
        let statuses = self.telemetry.current_statuses().await;
        Ok(Some(machine_view(
            &machine,
            &department_name,
            &statuses,
            Utc::now(),
        )))
    }

    /// Current status of one machine; offline with zero utilization when
    /// nothing recent was reported.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn machine_status(
        &self,
        id: MachineId,
    ) -> Result<Option<MachineStatusSnapshot>, GatewayError> {
        if self.load_machine(id).await?.is_none() {
            return Ok(None);
        }
        let statuses = self.telemetry.current_statuses().await;
        Ok(Some(status_or_offline(&statuses, id, Utc::now())))
    }

    /// Active machines of one department.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn machines_by_department(
        &self,
        id: DepartmentId,
    ) -> Result<Option<Vec<MachineView>>, GatewayError> {
        let Some(department) = self.load_department(id).await? else {
            return Ok(None);
        };
        let statuses = self.telemetry.current_statuses().await;
        let now = Utc::now();
        Ok(Some(
            department
                .active_machines()
                .map(|m| machine_view(m, &department.name, &statuses, now))
                .collect(),
        ))
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    /// Every job routing, optionally restricted to one status.
    ///
    /// The filter is matched case-insensitively (`in_progress`,
    /// `InProgress`).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an unknown status, before
    /// any metadata is loaded, or [`GatewayError::Infrastructure`] if
    /// metadata cannot be loaded.
    pub async fn list_jobs(&self, status: Option<&str>) -> Result<Vec<JobRoutingView>, GatewayError> {
        let filter = status
            .map(|raw| raw.parse::<JobStatus>())
            .transpose()
            .map_err(GatewayError::InvalidRequest)?;
        let jobs = self.jobs().await?;
        Ok(jobs
            .iter()
            .filter(|job| filter.is_none_or(|status| job.status == status))
            .map(job_view)
            .collect())
    }

    /// Released and in-progress jobs, most urgent first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn active_jobs(&self) -> Result<Vec<JobRoutingView>, GatewayError> {
        Ok(self.active_job_routings().await?.iter().map(job_view).collect())
    }

    /// One job routing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn job(&self, id: JobId) -> Result<Option<JobRoutingView>, GatewayError> {
        Ok(self.load_job(id).await?.as_ref().map(job_view))
    }

    // ── Workflows ───────────────────────────────────────────────────────

    /// Workflow view of one NPI job. `None` if the job does not exist or is
    /// not an NPI job.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn npi_workflow(
        &self,
        job_id: JobId,
    ) -> Result<Option<WorkflowVisualization>, GatewayError> {
        Ok(self
            .load_job(job_id)
            .await?
            .and_then(|job| workflow_view(&job, Utc::now())))
    }

    /// Workflow views of every active NPI job, most urgent first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if metadata cannot be loaded.
    pub async fn active_npi_workflows(&self) -> Result<Vec<WorkflowVisualization>, GatewayError> {
        let now = Utc::now();
        Ok(self
            .active_job_routings()
            .await?
            .iter()
            .filter_map(|job| workflow_view(job, now))
            .collect())
    }

    // ── Loading ─────────────────────────────────────────────────────────

    async fn load_department(&self, id: DepartmentId) -> Result<Option<Department>, GatewayError> {
        self.metadata
            .department(id)
            .await
            .map_err(|e| metadata_failure("department", id, e))
    }

    async fn load_machine(&self, id: MachineId) -> Result<Option<Machine>, GatewayError> {
        self.metadata
            .machine(id)
            .await
            .map_err(|e| metadata_failure("machine", id, e))
    }

    async fn load_job(&self, id: JobId) -> Result<Option<JobRouting>, GatewayError> {
        self.metadata
            .job(id)
            .await
            .map_err(|e| metadata_failure("job", id, e))
    }

    async fn jobs(&self) -> Result<Vec<JobRouting>, GatewayError> {
        self.metadata
            .list_jobs()
            .await
            .map_err(|e| metadata_failure("job", "*", e))
    }

    async fn active_job_routings(&self) -> Result<Vec<JobRouting>, GatewayError> {
        let mut jobs: Vec<JobRouting> = self
            .jobs()
            .await?
            .into_iter()
            .filter(JobRouting::is_active)
            .collect();
        jobs.sort_by_key(|job| job.priority);
        Ok(jobs)
    }
}

// ── View mapping ─────────────────────────────────────────────────────────

fn department_view(
    department: &Department,
    statuses: &StatusMap,
    jobs: &[JobRouting],
    now: DateTime<Utc>,
) -> DepartmentView {
    DepartmentView {
        id: department.id,
        name: department.name.clone(),
        department_type: department.department_type,
        description: department.description.clone(),
        layout: department.layout,
        metrics: department_metrics_with_jobs(department, statuses, jobs),
        machines: department
            .machines
            .iter()
            .map(|m| machine_view(m, &department.name, statuses, now))
            .collect(),
    }
}

fn machine_view(
    machine: &Machine,
    department_name: &str,
    statuses: &StatusMap,
    now: DateTime<Utc>,
) -> MachineView {
    MachineView {
        id: machine.id,
        name: machine.name.clone(),
        machine_type: machine.machine_type,
        model: machine.model.clone(),
        manufacturer: machine.manufacturer.clone(),
        location: MachineLocation {
            department_id: machine.department_id,
            department_name: department_name.to_string(),
            position: machine.position,
            rotation: machine.rotation,
        },
        status: status_or_offline(statuses, machine.id, now),
        capabilities: machine.capabilities.clone(),
    }
}

fn job_view(job: &JobRouting) -> JobRoutingView {
    JobRoutingView {
        id: job.id,
        job_number: job.job_number.clone(),
        part_number: job.part_number.clone(),
        description: job.description.clone(),
        quantity: job.quantity,
        quantity_completed: job.quantity_completed,
        priority: job.priority,
        job_type: job.job_type,
        status: job.status,
        due_date: job.due_date,
        operations: job.ordered_operations().into_iter().cloned().collect(),
        progress: job_progress(job),
    }
}
