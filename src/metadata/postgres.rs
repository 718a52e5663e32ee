//! PostgreSQL implementation of the metadata store.
//!
//! Reads the `departments`, `machines`, `job_routings` and `operations`
//! tables owned by the metadata service. Enum columns are stored as their
//! variant names (`CNCMill`, `InProgress`, ...) and are matched
//! case-insensitively, ignoring underscores.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::{MetadataError, MetadataStore};
use crate::domain::{
    Department, DepartmentId, DepartmentLayout, DepartmentRef, DepartmentType, JobId, JobRouting,
    JobStatus, JobType, Machine, MachineCapabilities, MachineId, MachineRef, MachineType,
    Operation, OperationId, OperationStatus, Position,
};

const DEPARTMENT_SELECT: &str = "SELECT id, name, type, description, \
     size_x::float8 AS size_x, size_y::float8 AS size_y, size_z::float8 AS size_z, \
     position_x::float8 AS position_x, position_y::float8 AS position_y, \
     position_z::float8 AS position_z, rotation::float8 AS rotation, is_active \
     FROM departments";

const MACHINE_SELECT: &str = "SELECT id, department_id, name, type, model, manufacturer, \
     position_x::float8 AS position_x, position_y::float8 AS position_y, \
     position_z::float8 AS position_z, rotation::float8 AS rotation, \
     max_spindle_speed, max_feed_rate::float8 AS max_feed_rate, number_of_axes, \
     has_tool_changer, tool_capacity, is_active \
     FROM machines";

const JOB_SELECT: &str = "SELECT id, job_number, part_number, description, quantity, \
     quantity_completed, priority, job_type, status, due_date, completed_at, \
     estimated_total_hours::float8 AS estimated_total_hours, \
     actual_total_hours::float8 AS actual_total_hours \
     FROM job_routings";

const OPERATION_SELECT: &str = "SELECT o.id, o.routing_id, o.sequence, o.operation_code, \
     o.description, o.department_id, d.name AS department_name, d.type AS department_type, \
     o.machine_id, m.name AS machine_name, \
     o.estimated_setup_hours::float8 AS estimated_setup_hours, \
     o.estimated_cycle_hours::float8 AS estimated_cycle_hours, \
     o.actual_setup_hours::float8 AS actual_setup_hours, \
     o.actual_cycle_hours::float8 AS actual_cycle_hours, \
     o.status, o.started_at, o.completed_at \
     FROM operations o \
     JOIN departments d ON d.id = o.department_id \
     LEFT JOIN machines m ON m.id = o.machine_id";

/// Connection settings for [`PostgresMetadataStore::connect`].
#[derive(Debug, Clone)]
pub struct PgSettings {
    /// PostgreSQL connection string.
    pub url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Minimum idle connections.
    pub min_connections: u32,
    /// Timeout for acquiring a connection.
    pub connect_timeout: Duration,
}

/// PostgreSQL-backed metadata store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

impl PostgresMetadataStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Backend`] if the database is unreachable.
    pub async fn connect(settings: &PgSettings) -> Result<Self, MetadataError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.connect_timeout)
            .connect(&settings.url)
            .await?;
        Ok(Self::new(pool))
    }

    async fn machines_where(
        &self,
        department: Option<Uuid>,
    ) -> Result<Vec<Machine>, MetadataError> {
        let rows = match department {
            Some(id) => {
                sqlx::query(&format!(
                    "{MACHINE_SELECT} WHERE department_id = $1 ORDER BY name"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{MACHINE_SELECT} ORDER BY name"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(machine_from_row).collect()
    }

    async fn operations_where(
        &self,
        routing: Option<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<Operation>>, MetadataError> {
        let rows = match routing {
            Some(id) => {
                sqlx::query(&format!(
                    "{OPERATION_SELECT} WHERE o.routing_id = $1 ORDER BY o.sequence"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{OPERATION_SELECT} ORDER BY o.routing_id, o.sequence"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        let mut grouped: HashMap<Uuid, Vec<Operation>> = HashMap::new();
        for row in &rows {
            let (routing_id, op) = operation_from_row(row)?;
            grouped.entry(routing_id).or_default().push(op);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn list_departments(&self) -> Result<Vec<Department>, MetadataError> {
        let rows = sqlx::query(&format!("{DEPARTMENT_SELECT} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        let mut machines: HashMap<DepartmentId, Vec<Machine>> = HashMap::new();
        for machine in self.machines_where(None).await? {
            machines.entry(machine.department_id).or_default().push(machine);
        }
        rows.iter()
            .map(|row| {
                let id = DepartmentId::from_uuid(row.try_get("id")?);
                department_from_row(row, machines.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, MetadataError> {
        let row = sqlx::query(&format!("{DEPARTMENT_SELECT} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let machines = self.machines_where(Some(*id.as_uuid())).await?;
        department_from_row(&row, machines).map(Some)
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, MetadataError> {
        self.machines_where(None).await
    }

    async fn machine(&self, id: MachineId) -> Result<Option<Machine>, MetadataError> {
        let row = sqlx::query(&format!("{MACHINE_SELECT} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(machine_from_row).transpose()
    }

    async fn list_jobs(&self) -> Result<Vec<JobRouting>, MetadataError> {
        let rows = sqlx::query(&format!("{JOB_SELECT} ORDER BY priority, job_number"))
            .fetch_all(&self.pool)
            .await?;
        let mut operations = self.operations_where(None).await?;
        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                job_from_row(row, operations.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn job(&self, id: JobId) -> Result<Option<JobRouting>, MetadataError> {
        let row = sqlx::query(&format!("{JOB_SELECT} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut operations = self.operations_where(Some(*id.as_uuid())).await?;
        job_from_row(&row, operations.remove(id.as_uuid()).unwrap_or_default()).map(Some)
    }
}

// ── Row decoding ────────────────────────────────────────────────────────

fn department_from_row(row: &PgRow, machines: Vec<Machine>) -> Result<Department, MetadataError> {
    let kind: String = row.try_get("type")?;
    Ok(Department {
        id: DepartmentId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        department_type: parse_department_type(&kind)?,
        description: row.try_get("description")?,
        layout: DepartmentLayout {
            size_x: row.try_get("size_x")?,
            size_y: row.try_get("size_y")?,
            size_z: row.try_get("size_z")?,
            position_x: row.try_get("position_x")?,
            position_y: row.try_get("position_y")?,
            position_z: row.try_get("position_z")?,
            rotation: row.try_get("rotation")?,
        },
        is_active: row.try_get("is_active")?,
        machines,
    })
}

fn machine_from_row(row: &PgRow) -> Result<Machine, MetadataError> {
    let kind: String = row.try_get("type")?;
    let max_spindle_speed: Option<i32> = row.try_get("max_spindle_speed")?;
    let number_of_axes: Option<i32> = row.try_get("number_of_axes")?;
    let tool_capacity: Option<i32> = row.try_get("tool_capacity")?;
    Ok(Machine {
        id: MachineId::from_uuid(row.try_get("id")?),
        department_id: DepartmentId::from_uuid(row.try_get("department_id")?),
        name: row.try_get("name")?,
        machine_type: parse_machine_type(&kind)?,
        model: row.try_get("model")?,
        manufacturer: row.try_get("manufacturer")?,
        position: Position {
            x: row.try_get("position_x")?,
            y: row.try_get("position_y")?,
            z: row.try_get("position_z")?,
        },
        rotation: row.try_get("rotation")?,
        capabilities: MachineCapabilities {
            max_spindle_speed: max_spindle_speed.and_then(|v| u32::try_from(v).ok()),
            max_feed_rate: row.try_get("max_feed_rate")?,
            number_of_axes: number_of_axes.and_then(|v| u32::try_from(v).ok()),
            has_tool_changer: row.try_get("has_tool_changer")?,
            tool_capacity: tool_capacity.and_then(|v| u32::try_from(v).ok()),
        },
        is_active: row.try_get("is_active")?,
    })
}

fn job_from_row(row: &PgRow, operations: Vec<Operation>) -> Result<JobRouting, MetadataError> {
    let job_type: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    let quantity: i32 = row.try_get("quantity")?;
    let quantity_completed: i32 = row.try_get("quantity_completed")?;
    Ok(JobRouting {
        id: JobId::from_uuid(row.try_get("id")?),
        job_number: row.try_get("job_number")?,
        part_number: row.try_get("part_number")?,
        description: row.try_get("description")?,
        quantity: u32::try_from(quantity).unwrap_or(0),
        quantity_completed: u32::try_from(quantity_completed).unwrap_or(0),
        priority: row.try_get("priority")?,
        job_type: parse_job_type(&job_type)?,
        status: parse_job_status(&status)?,
        due_date: row.try_get::<Option<DateTime<Utc>>, _>("due_date")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
        estimated_total_hours: row.try_get("estimated_total_hours")?,
        actual_total_hours: row.try_get("actual_total_hours")?,
        operations,
    })
}

fn operation_from_row(row: &PgRow) -> Result<(Uuid, Operation), MetadataError> {
    let department_type: String = row.try_get("department_type")?;
    let status: String = row.try_get("status")?;
    let machine_id: Option<Uuid> = row.try_get("machine_id")?;
    let machine_name: Option<String> = row.try_get("machine_name")?;
    let op = Operation {
        id: OperationId::from_uuid(row.try_get("id")?),
        sequence: row.try_get("sequence")?,
        operation_code: row.try_get("operation_code")?,
        description: row.try_get("description")?,
        department: DepartmentRef {
            id: DepartmentId::from_uuid(row.try_get("department_id")?),
            name: row.try_get("department_name")?,
            department_type: parse_department_type(&department_type)?,
        },
        machine: machine_id.map(|id| MachineRef {
            id: MachineId::from_uuid(id),
            name: machine_name.unwrap_or_default(),
        }),
        estimated_setup_hours: row.try_get("estimated_setup_hours")?,
        estimated_cycle_hours: row.try_get("estimated_cycle_hours")?,
        actual_setup_hours: row.try_get("actual_setup_hours")?,
        actual_cycle_hours: row.try_get("actual_cycle_hours")?,
        status: parse_operation_status(&status)?,
        started_at: row.try_get::<Option<DateTime<Utc>>, _>("started_at")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    };
    Ok((row.try_get("routing_id")?, op))
}

// ── Enum column parsing ─────────────────────────────────────────────────

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn unknown(column: &str, raw: &str) -> MetadataError {
    MetadataError::Backend(format!("unknown {column} value: {raw}"))
}

fn parse_department_type(raw: &str) -> Result<DepartmentType, MetadataError> {
    Ok(match normalize(raw).as_str() {
        "cncmill" => DepartmentType::CncMill,
        "cnclathe" => DepartmentType::CncLathe,
        "programming" => DepartmentType::Programming,
        "saw" => DepartmentType::Saw,
        "shippingreceiving" => DepartmentType::ShippingReceiving,
        "deburr" => DepartmentType::Deburr,
        "partscleaning" => DepartmentType::PartsCleaning,
        "frontoffice" => DepartmentType::FrontOffice,
        "toolcrib" => DepartmentType::ToolCrib,
        _ => return Err(unknown("department type", raw)),
    })
}

fn parse_machine_type(raw: &str) -> Result<MachineType, MetadataError> {
    Ok(match normalize(raw).as_str() {
        "threeaxismill" => MachineType::ThreeAxisMill,
        "fiveaxismill" => MachineType::FiveAxisMill,
        "turningcenter" => MachineType::TurningCenter,
        "multiaxislathe" => MachineType::MultiAxisLathe,
        "bandsaw" => MachineType::BandSaw,
        "camworkstation" => MachineType::CamWorkstation,
        "washingstation" => MachineType::WashingStation,
        "deburrstation" => MachineType::DeburrStation,
        _ => return Err(unknown("machine type", raw)),
    })
}

fn parse_job_type(raw: &str) -> Result<JobType, MetadataError> {
    Ok(match normalize(raw).as_str() {
        "npi" => JobType::Npi,
        "production" => JobType::Production,
        "rework" => JobType::Rework,
        "prototype" => JobType::Prototype,
        _ => return Err(unknown("job type", raw)),
    })
}

fn parse_job_status(raw: &str) -> Result<JobStatus, MetadataError> {
    raw.parse().map_err(|_| unknown("job status", raw))
}

fn parse_operation_status(raw: &str) -> Result<OperationStatus, MetadataError> {
    Ok(match normalize(raw).as_str() {
        "pending" => OperationStatus::Pending,
        "inprogress" => OperationStatus::InProgress,
        "completed" => OperationStatus::Completed,
        "skipped" => OperationStatus::Skipped,
        _ => return Err(unknown("operation status", raw)),
    })
}
