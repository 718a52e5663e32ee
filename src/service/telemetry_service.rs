//! Telemetry service: owns the machine status map and turns incoming
//! telemetry into broadcast events.
//!
//! The whole status map lives under one cache key. Updates are a
//! read-modify-write of that blob, serialized inside the process by a
//! single-writer mutex so concurrent producers never lose each other's
//! entries. Another process writing the same key is last-writer-wins at
//! whole-map granularity.
//!
//! Rewriting the blob renews its TTL, so every entry also carries its own
//! expiry: an entry recorded by this process is fresh for `status_ttl`
//! after it was recorded, one written elsewhere for `status_ttl` after its
//! `captured_at`. Stale entries are hidden from readers and dropped on the
//! next write.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::aggregator::{StatusMap, job_progress};
use crate::cache::{StatusCache, keys};
use crate::domain::{
    AlarmEventMessage, AlarmSeverity, BroadcastDispatcher, DepartmentId, DispatchReport, JobId,
    JobProgressUpdateMessage, MachineId, MachineStatusSnapshot, MachineStatusUpdateMessage,
    OperationId, OperationStatus, ShopEvent,
};
use crate::error::GatewayError;
use crate::metadata::MetadataStore;

/// Outcome of [`TelemetryService::record_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecorded {
    /// Whether the status map was written to the cache.
    pub cached: bool,
    /// Fan-out of the status event.
    pub dispatch: DispatchReport,
}

/// Records machine telemetry and publishes the resulting events.
#[derive(Debug)]
pub struct TelemetryService {
    cache: StatusCache,
    metadata: Arc<dyn MetadataStore>,
    dispatcher: Arc<BroadcastDispatcher>,
    status_ttl: Duration,
    /// Single-writer lock over the status map, holding when each entry was
    /// recorded by this process.
    recorded: Mutex<HashMap<MachineId, Instant>>,
}

impl TelemetryService {
    /// Creates a new `TelemetryService`.
    #[must_use]
    pub fn new(
        cache: StatusCache,
        metadata: Arc<dyn MetadataStore>,
        dispatcher: Arc<BroadcastDispatcher>,
        status_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            metadata,
            dispatcher,
            status_ttl,
            recorded: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a reference to the inner [`BroadcastDispatcher`].
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<BroadcastDispatcher> {
        &self.dispatcher
    }

    /// Latest status of every machine that reported within the status TTL.
    ///
    /// An expired, missing or unreadable map yields an empty map.
    pub async fn current_statuses(&self) -> StatusMap {
        let recorded = self.recorded.lock().await;
        let mut statuses = self.stored_statuses().await;
        self.retain_fresh(&mut statuses, &recorded);
        statuses
    }

    /// Stores `snapshot` as the latest status of `machine_id` and
    /// broadcasts it.
    ///
    /// The snapshot's own machine id is overwritten with `machine_id`. A
    /// failed cache write is logged and does not prevent the broadcast.
    /// Events leave in the same order as the cache writes, so subscribers
    /// and readers agree on the latest status.
    pub async fn record_status(
        &self,
        machine_id: MachineId,
        mut snapshot: MachineStatusSnapshot,
    ) -> StatusRecorded {
        snapshot.machine_id = machine_id;
        let (machine_name, department_id) = self.describe_machine(machine_id).await;
        let event = ShopEvent::MachineStatusUpdate(MachineStatusUpdateMessage {
            machine_id,
            machine_name,
            department_id,
            status: snapshot.status,
            utilization_percent: snapshot.utilization_percent(),
            spindle_load: snapshot.spindle_load,
            timestamp: snapshot.captured_at,
        });
        let status = snapshot.status;

        let mut recorded = self.recorded.lock().await;
        let mut statuses = self.stored_statuses().await;
        self.retain_fresh(&mut statuses, &recorded);
        statuses.insert(machine_id, snapshot);
        recorded.retain(|id, _| statuses.contains_key(id));
        recorded.insert(machine_id, Instant::now());

        let cached = self
            .cache
            .write(keys::MACHINE_STATUSES, &statuses, self.status_ttl)
            .await;
        // dispatch never waits on a full outbox
        let dispatch = self.dispatcher.dispatch(event).await;
        drop(recorded);

        tracing::debug!(
            %machine_id,
            %status,
            cached,
            machines = statuses.len(),
            delivered = dispatch.delivered,
            "machine status recorded"
        );
        StatusRecorded { cached, dispatch }
    }

    /// Broadcasts an alarm raised by `machine_id`.
    pub async fn raise_alarm(
        &self,
        machine_id: MachineId,
        alarm_code: String,
        severity: AlarmSeverity,
        message: String,
    ) -> DispatchReport {
        let (machine_name, department_id) = self.describe_machine(machine_id).await;
        tracing::info!(%machine_id, alarm_code = %alarm_code, ?severity, "machine alarm raised");
        self.dispatcher
            .dispatch(ShopEvent::AlarmEvent(AlarmEventMessage {
                machine_id,
                machine_name,
                department_id,
                alarm_code,
                severity,
                message,
                timestamp: Utc::now(),
            }))
            .await
    }

    /// Broadcasts a state change of one operation of a job.
    ///
    /// The job's percent complete is recomputed as if the operation had
    /// the reported status. Returns `Ok(None)` if the job or the operation
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Infrastructure`] if the job cannot be loaded.
    pub async fn report_operation_progress(
        &self,
        job_id: JobId,
        operation_id: OperationId,
        status: OperationStatus,
    ) -> Result<Option<DispatchReport>, GatewayError> {
        let job = self
            .metadata
            .job(job_id)
            .await
            .map_err(|e| super::metadata_failure("job", job_id, e))?;
        let Some(mut job) = job else {
            return Ok(None);
        };
        let Some(op) = job.operations.iter_mut().find(|op| op.id == operation_id) else {
            return Ok(None);
        };
        op.status = status;
        let department_id = op.department.id;
        let progress = job_progress(&job);

        let report = self
            .dispatcher
            .dispatch(ShopEvent::JobProgressUpdate(JobProgressUpdateMessage {
                job_id,
                job_number: job.job_number,
                operation_id,
                department_id: Some(department_id),
                percent_complete: progress.percent_complete,
                status,
                timestamp: Utc::now(),
            }))
            .await;
        tracing::debug!(%job_id, %operation_id, ?status, "operation progress reported");
        Ok(Some(report))
    }

    /// The status map as stored, without the per-entry expiry applied.
    async fn stored_statuses(&self) -> StatusMap {
        self.cache
            .read(keys::MACHINE_STATUSES)
            .await
            .unwrap_or_default()
    }

    /// Drops entries older than the status TTL.
    fn retain_fresh(&self, statuses: &mut StatusMap, recorded: &HashMap<MachineId, Instant>) {
        let now = Instant::now();
        let wall_now = Utc::now();
        let ttl = self.status_ttl;
        statuses.retain(|id, snapshot| match recorded.get(id) {
            Some(at) => now.saturating_duration_since(*at) < ttl,
            None => (wall_now - snapshot.captured_at)
                .to_std()
                .ok()
                .is_none_or(|age| age < ttl),
        });
    }

    /// Best-effort name and department of a machine for event payloads.
    async fn describe_machine(&self, machine_id: MachineId) -> (String, Option<DepartmentId>) {
        match self.metadata.machine(machine_id).await {
            Ok(Some(machine)) => (machine.name, Some(machine.department_id)),
            Ok(None) => {
                tracing::debug!(%machine_id, "telemetry for unknown machine");
                (String::new(), None)
            }
            Err(e) => {
                tracing::warn!(%machine_id, error = %e, "machine lookup failed; broadcasting without department");
                (String::new(), None)
            }
        }
    }
}
