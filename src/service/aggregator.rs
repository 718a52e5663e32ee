//! Derived views over entity metadata and the status map.
//!
//! Every function here is pure: the same inputs always produce the same
//! output, and "now" is passed in by the caller. A machine without an
//! entry in the status map counts as offline with zero utilization.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{
    Department, DepartmentId, DepartmentMetrics, JobProgress, JobRouting, MachineId,
    MachineStatus, MachineStatusSnapshot, OperationStatus, WorkflowStep, WorkflowTimeline,
    WorkflowVisualization,
};

/// Latest status of every machine that reported one.
pub type StatusMap = HashMap<MachineId, MachineStatusSnapshot>;

/// Returns the cached status of `machine_id`, or an offline snapshot
/// stamped with `now`.
#[must_use]
pub fn status_or_offline(
    statuses: &StatusMap,
    machine_id: MachineId,
    now: DateTime<Utc>,
) -> MachineStatusSnapshot {
    statuses
        .get(&machine_id)
        .cloned()
        .unwrap_or_else(|| MachineStatusSnapshot::offline(machine_id, now))
}

/// Folds the active machines of `department` into metrics. Job counts are
/// left at zero; see [`department_metrics_with_jobs`].
#[must_use]
pub fn department_metrics(department: &Department, statuses: &StatusMap) -> DepartmentMetrics {
    let mut metrics = DepartmentMetrics {
        average_utilization: 0.0,
        machine_count: 0,
        running_machines: 0,
        idle_machines: 0,
        alarm_machines: 0,
        active_jobs: 0,
        queued_jobs: 0,
    };
    let mut total_utilization = 0.0;

    for machine in department.active_machines() {
        metrics.machine_count = metrics.machine_count.saturating_add(1);
        let Some(snapshot) = statuses.get(&machine.id) else {
            continue;
        };
        total_utilization += snapshot.utilization_percent();
        match snapshot.status {
            MachineStatus::Running => metrics.running_machines += 1,
            MachineStatus::Idle => metrics.idle_machines += 1,
            MachineStatus::Alarm => metrics.alarm_machines += 1,
            MachineStatus::Offline | MachineStatus::Paused | MachineStatus::Maintenance => {}
        }
    }

    if metrics.machine_count > 0 {
        metrics.average_utilization = total_utilization / f64::from(metrics.machine_count);
    }
    metrics
}

/// [`department_metrics`] plus the department's active and queued job
/// counts.
#[must_use]
pub fn department_metrics_with_jobs(
    department: &Department,
    statuses: &StatusMap,
    jobs: &[JobRouting],
) -> DepartmentMetrics {
    let mut metrics = department_metrics(department, statuses);
    let (active, queued) = job_counts(department.id, jobs);
    metrics.active_jobs = active;
    metrics.queued_jobs = queued;
    metrics
}

/// Counts `(active, queued)` operations routed to `department_id`.
///
/// Active operations are in progress. Queued operations are pending and
/// belong to a job that is released or in progress.
#[must_use]
pub fn job_counts(department_id: DepartmentId, jobs: &[JobRouting]) -> (u32, u32) {
    let mut active = 0_u32;
    let mut queued = 0_u32;
    for job in jobs {
        for op in job.operations.iter().filter(|op| op.department.id == department_id) {
            match op.status {
                OperationStatus::InProgress => active = active.saturating_add(1),
                OperationStatus::Pending if job.is_active() => queued = queued.saturating_add(1),
                _ => {}
            }
        }
    }
    (active, queued)
}

/// Derives progress from a job's operations.
///
/// Estimated hours come from the job when set, otherwise from the sum of
/// the operations' estimates. Actual hours likewise fall back to the
/// operations, and stay absent when nothing was booked anywhere.
#[must_use]
pub fn job_progress(job: &JobRouting) -> JobProgress {
    let total = count(job.operations.len());
    let completed = count(
        job.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Completed)
            .count(),
    );
    let percent_complete = if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * 100.0
    };

    let estimated_total_hours = job.estimated_total_hours.unwrap_or_else(|| {
        job.operations
            .iter()
            .map(crate::domain::Operation::estimated_total_hours)
            .sum()
    });
    let actual_total_hours = job.actual_total_hours.or_else(|| {
        job.operations
            .iter()
            .filter_map(crate::domain::Operation::actual_total_hours)
            .reduce(|a, b| a + b)
    });
    let hours_remaining = (estimated_total_hours - actual_total_hours.unwrap_or(0.0)).max(0.0);

    JobProgress {
        percent_complete,
        completed_operations: completed,
        total_operations: total,
        estimated_total_hours,
        actual_total_hours,
        hours_remaining,
    }
}

/// Builds the workflow view of an NPI job. Returns `None` for any other
/// job type.
#[must_use]
pub fn workflow_view(job: &JobRouting, now: DateTime<Utc>) -> Option<WorkflowVisualization> {
    if !job.is_npi() {
        return None;
    }

    let ordered = job.ordered_operations();
    let progress = job_progress(job);

    let steps = ordered
        .iter()
        .map(|op| WorkflowStep {
            sequence: op.sequence,
            operation_id: op.id,
            name: op
                .description
                .clone()
                .unwrap_or_else(|| op.operation_code.clone()),
            department_id: op.department.id,
            department_name: op.department.name.clone(),
            estimated_hours: op.estimated_total_hours(),
            actual_hours: op.actual_total_hours(),
            status: op.status,
            started_at: op.started_at,
            completed_at: op.completed_at,
        })
        .collect();

    let start_time = ordered
        .iter()
        .find_map(|op| op.started_at)
        .unwrap_or(now);
    let timeline = WorkflowTimeline {
        start_time,
        end_time: job.completed_at,
        estimated_end_time: add_hours(now, progress.hours_remaining),
        total_duration_hours: progress.estimated_total_hours,
        elapsed_hours: progress.actual_total_hours.unwrap_or(0.0),
        remaining_hours: progress.hours_remaining,
    };

    Some(WorkflowVisualization {
        job_id: job.id,
        job_number: job.job_number.clone(),
        part_number: job.part_number.clone(),
        steps,
        timeline,
        progress,
    })
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn add_hours(at: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation)]
    let millis = (hours * 3_600_000.0).round() as i64;
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(at)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::{
        DepartmentLayout, DepartmentRef, DepartmentType, JobId, JobStatus, JobType, Machine,
        MachineType, Operation, OperationId,
    };

    fn machine(department_id: DepartmentId, is_active: bool) -> Machine {
        Machine {
            id: MachineId::new(),
            department_id,
            name: "DMG Mori NLX".to_string(),
            machine_type: MachineType::TurningCenter,
            model: None,
            manufacturer: None,
            position: Default::default(),
            rotation: 0.0,
            capabilities: Default::default(),
            is_active,
        }
    }

    fn department(machines: usize, inactive: usize) -> Department {
        let id = DepartmentId::new();
        let mut all: Vec<Machine> = (0..machines).map(|_| machine(id, true)).collect();
        all.extend((0..inactive).map(|_| machine(id, false)));
        Department {
            id,
            name: "Lathe".to_string(),
            department_type: DepartmentType::CncLathe,
            description: None,
            layout: DepartmentLayout::default(),
            is_active: true,
            machines: all,
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

    fn job(job_type: JobType, status: JobStatus, operations: Vec<Operation>) -> JobRouting {
        JobRouting {
            id: JobId::new(),
            job_number: "J-2001".to_string(),
            part_number: "BRKT-7".to_string(),
            description: None,
            quantity: 10,
            quantity_completed: 0,
            priority: 5,
            job_type,
            status,
            due_date: None,
            completed_at: None,
            estimated_total_hours: None,
            actual_total_hours: None,
            operations,
        }
    }

    fn snapshot(id: MachineId, status: MachineStatus, utilization: f64) -> MachineStatusSnapshot {
        MachineStatusSnapshot::new(id, status, utilization, Utc::now())
    }

    #[test]
    fn no_active_machines_means_zero_average() {
        let dept = department(0, 2);
        let mut statuses = StatusMap::new();
        for m in &dept.machines {
            statuses.insert(m.id, snapshot(m.id, MachineStatus::Running, 90.0));
        }
        let metrics = department_metrics(&dept, &statuses);
        assert_eq!(metrics.machine_count, 0);
        assert_eq!(metrics.running_machines, 0);
        assert!(metrics.average_utilization.abs() < f64::EPSILON);
    }

    #[test]
    fn missing_status_counts_in_no_bucket_and_contributes_zero() {
        let dept = department(2, 0);
        let Some(first) = dept.machines.first() else {
            panic!("two machines expected");
        };
        let mut statuses = StatusMap::new();
        statuses.insert(first.id, snapshot(first.id, MachineStatus::Running, 80.0));

        let metrics = department_metrics(&dept, &statuses);
        assert_eq!(metrics.machine_count, 2);
        assert_eq!(metrics.running_machines, 1);
        assert_eq!(metrics.idle_machines + metrics.alarm_machines, 0);
        assert!((metrics.average_utilization - 40.0).abs() < 1e-9);
    }

    #[test]
    fn buckets_follow_status() {
        let dept = department(4, 0);
        let statuses: StatusMap = dept
            .machines
            .iter()
            .zip([
                MachineStatus::Running,
                MachineStatus::Idle,
                MachineStatus::Alarm,
                MachineStatus::Paused,
            ])
            .map(|(m, s)| (m.id, snapshot(m.id, s, 50.0)))
            .collect();
        let metrics = department_metrics(&dept, &statuses);
        assert_eq!(
            (
                metrics.running_machines,
                metrics.idle_machines,
                metrics.alarm_machines
            ),
            (1, 1, 1)
        );
        assert!((metrics.average_utilization - 50.0).abs() < 1e-9);
    }

    #[test]
    fn job_counts_only_consider_own_department() {
        let mill = DepartmentId::new();
        let saw = DepartmentId::new();
        let jobs = vec![
            job(
                JobType::Production,
                JobStatus::InProgress,
                vec![
                    operation(10, OperationStatus::Completed, saw),
                    operation(20, OperationStatus::InProgress, mill),
                    operation(30, OperationStatus::Pending, mill),
                ],
            ),
            job(
                JobType::Production,
                JobStatus::Created,
                vec![operation(10, OperationStatus::Pending, mill)],
            ),
            job(
                JobType::Npi,
                JobStatus::Released,
                vec![operation(10, OperationStatus::Pending, mill)],
            ),
        ];
        assert_eq!(job_counts(mill, &jobs), (1, 2));
        assert_eq!(job_counts(saw, &jobs), (0, 0));

        let mut dept = department(0, 0);
        dept.id = mill;
        let metrics = department_metrics_with_jobs(&dept, &StatusMap::new(), &jobs);
        assert_eq!((metrics.active_jobs, metrics.queued_jobs), (1, 2));
    }

    #[test]
    fn empty_job_is_zero_percent() {
        let progress = job_progress(&job(JobType::Npi, JobStatus::Created, Vec::new()));
        assert!(progress.percent_complete.abs() < f64::EPSILON);
        assert_eq!(progress.total_operations, 0);
        assert_eq!(progress.actual_total_hours, None);
    }

    #[test]
    fn hours_fall_back_to_operations() {
        let dept = DepartmentId::new();
        let mut first = operation(10, OperationStatus::Completed, dept);
        first.actual_setup_hours = Some(0.75);
        first.actual_cycle_hours = Some(2.0);
        let second = operation(20, OperationStatus::Pending, dept);
        let progress = job_progress(&job(
            JobType::Production,
            JobStatus::InProgress,
            vec![first, second],
        ));

        assert!((progress.estimated_total_hours - 4.0).abs() < 1e-9);
        assert_eq!(progress.actual_total_hours, Some(2.75));
        assert!((progress.hours_remaining - 1.25).abs() < 1e-9);
    }

    #[test]
    fn remaining_hours_never_negative() {
        let mut overrun = job(JobType::Production, JobStatus::InProgress, Vec::new());
        overrun.estimated_total_hours = Some(4.0);
        overrun.actual_total_hours = Some(6.5);
        assert!(job_progress(&overrun).hours_remaining.abs() < f64::EPSILON);
    }

    #[test]
    fn npi_with_half_the_operations_done() {
        let dept = DepartmentId::new();
        let now = Utc::now();
        let started = now - TimeDelta::hours(3);
        let mut ops = vec![
            operation(40, OperationStatus::Pending, dept),
            operation(20, OperationStatus::Completed, dept),
            operation(30, OperationStatus::InProgress, dept),
            operation(10, OperationStatus::Completed, dept),
        ];
        if let Some(op) = ops.get_mut(3) {
            op.started_at = Some(started);
            op.description = Some("Saw stock".to_string());
        }
        let npi = job(JobType::Npi, JobStatus::InProgress, ops);

        let Some(view) = workflow_view(&npi, now) else {
            panic!("NPI job should have a workflow");
        };
        assert!((view.progress.percent_complete - 50.0).abs() < 1e-9);
        let sequences: Vec<i32> = view.steps.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![10, 20, 30, 40]);
        assert_eq!(view.steps.first().map(|s| s.name.as_str()), Some("Saw stock"));
        assert_eq!(view.steps.get(1).map(|s| s.name.as_str()), Some("OP20"));
        assert_eq!(view.timeline.start_time, started);
        assert_eq!(view.timeline.estimated_end_time, now + TimeDelta::hours(8));
        assert!((view.timeline.elapsed_hours).abs() < f64::EPSILON);
    }

    #[test]
    fn timeline_starts_now_when_nothing_started() {
        let now = Utc::now();
        let npi = job(
            JobType::Npi,
            JobStatus::Released,
            vec![operation(10, OperationStatus::Pending, DepartmentId::new())],
        );
        let Some(view) = workflow_view(&npi, now) else {
            panic!("NPI job should have a workflow");
        };
        assert_eq!(view.timeline.start_time, now);
        assert_eq!(view.timeline.end_time, None);
    }

    #[test]
    fn non_npi_has_no_workflow() {
        let production = job(JobType::Production, JobStatus::InProgress, Vec::new());
        assert!(workflow_view(&production, Utc::now()).is_none());
    }

    #[test]
    fn status_defaults_to_offline() {
        let id = MachineId::new();
        let now = Utc::now();
        let snapshot = status_or_offline(&StatusMap::new(), id, now);
        assert_eq!(snapshot.status, MachineStatus::Offline);
        assert_eq!(snapshot.captured_at, now);
        assert!(snapshot.utilization_percent().abs() < f64::EPSILON);
    }

    fn arb_status() -> impl Strategy<Value = MachineStatus> {
        prop_oneof![
            Just(MachineStatus::Offline),
            Just(MachineStatus::Idle),
            Just(MachineStatus::Running),
            Just(MachineStatus::Paused),
            Just(MachineStatus::Alarm),
            Just(MachineStatus::Maintenance),
        ]
    }

    fn arb_op_status() -> impl Strategy<Value = OperationStatus> {
        prop_oneof![
            Just(OperationStatus::Pending),
            Just(OperationStatus::InProgress),
            Just(OperationStatus::Completed),
            Just(OperationStatus::Skipped),
        ]
    }

    proptest! {
        #[test]
        fn average_utilization_stays_in_range(
            machines in proptest::collection::vec(
                (any::<bool>(), proptest::option::of((arb_status(), -50.0_f64..200.0))),
                0..12,
            )
        ) {
            let id = DepartmentId::new();
            let mut dept = department(0, 0);
            dept.id = id;
            let mut statuses = StatusMap::new();
            for (active, status) in machines {
                let m = machine(id, active);
                if let Some((s, u)) = status {
                    statuses.insert(m.id, snapshot(m.id, s, u));
                }
                dept.machines.push(m);
            }

            let first = department_metrics(&dept, &statuses);
            let second = department_metrics(&dept, &statuses);
            prop_assert_eq!(&first, &second);
            prop_assert!((0.0..=100.0).contains(&first.average_utilization));
            prop_assert!(
                first.running_machines + first.idle_machines + first.alarm_machines
                    <= first.machine_count
            );
            if first.machine_count == 0 {
                prop_assert!(first.average_utilization.abs() < f64::EPSILON);
            }
        }

        #[test]
        fn percent_complete_stays_in_range(
            statuses in proptest::collection::vec(arb_op_status(), 0..16)
        ) {
            let dept = DepartmentId::new();
            let ops: Vec<Operation> = statuses
                .iter()
                .zip(1_i32..)
                .map(|(s, seq)| operation(seq * 10, *s, dept))
                .collect();
            let all_completed =
                !ops.is_empty() && ops.iter().all(|op| op.status == OperationStatus::Completed);
            let progress = job_progress(&job(JobType::Npi, JobStatus::InProgress, ops));

            prop_assert!((0.0..=100.0).contains(&progress.percent_complete));
            prop_assert!(progress.hours_remaining >= 0.0);
            prop_assert_eq!(
                (progress.percent_complete - 100.0).abs() < f64::EPSILON,
                all_completed
            );
            if statuses.is_empty() {
                prop_assert!(progress.percent_complete.abs() < f64::EPSILON);
            }
        }
    }
}
