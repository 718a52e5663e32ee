//! Service-level scenarios: statuses, aggregation, and fan-out wired
//! together through [`AppState`](shopfloor_gateway::app_state::AppState).

#![allow(clippy::panic)]

mod common;

use chrono::Utc;

use shopfloor_gateway::domain::{
    AlarmSeverity, ConnectionId, MachineStatus, MachineStatusSnapshot, OperationStatus, ShopEvent,
    Topic,
};

#[tokio::test]
async fn machine_without_status_is_offline_and_ignored_by_metrics() {
    let shop = common::shop();
    let service = &shop.state.shop_service;

    let Ok(Some(status)) = service.machine_status(shop.m1).await else {
        panic!("known machine should have a status");
    };
    assert_eq!(status.status, MachineStatus::Offline);
    assert!(status.utilization_percent().abs() < f64::EPSILON);

    let Ok(Some(metrics)) = service.department_metrics(shop.mill).await else {
        panic!("department should have metrics");
    };
    assert_eq!(metrics.machine_count, 2);
    assert_eq!(metrics.running_machines, 0);
    assert_eq!(metrics.idle_machines, 0);
    assert_eq!(metrics.alarm_machines, 0);
    assert!(metrics.average_utilization.abs() < f64::EPSILON);
}

#[tokio::test]
async fn recorded_status_feeds_department_average() {
    let shop = common::shop();
    let snapshot = MachineStatusSnapshot::new(shop.m2, MachineStatus::Running, 80.0, Utc::now());
    let ack = shop
        .state
        .telemetry_service
        .record_status(shop.m2, snapshot)
        .await;
    assert!(ack.cached);

    let Ok(Some(metrics)) = shop.state.shop_service.department_metrics(shop.mill).await else {
        panic!("department should have metrics");
    };
    assert_eq!(metrics.running_machines, 1);
    assert!((metrics.average_utilization - 40.0).abs() < 1e-9);
}

#[tokio::test]
async fn half_completed_npi_job_reports_fifty_percent_and_four_steps() {
    let shop = common::shop();
    let service = &shop.state.shop_service;

    let Ok(Some(job)) = service.job(shop.j1).await else {
        panic!("job should exist");
    };
    assert!((job.progress.percent_complete - 50.0).abs() < 1e-9);

    let Ok(Some(workflow)) = service.npi_workflow(shop.j1).await else {
        panic!("NPI job should have a workflow");
    };
    assert_eq!(workflow.steps.len(), 4);
    let sequences: Vec<i32> = workflow.steps.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![10, 20, 30, 40]);
    assert_eq!(workflow.steps.first().map(|s| s.name.as_str()), Some("OP10"));
}

#[tokio::test]
async fn alarm_reaches_overlapping_subscriber_exactly_once() {
    let shop = common::shop();
    let dispatcher = &shop.state.dispatcher;
    let conn = ConnectionId::new();
    let mut outbox = dispatcher.attach(conn).await;
    dispatcher.registry().join(conn, Topic::Shop).await;
    dispatcher.registry().join(conn, Topic::Machine(shop.m1)).await;

    let report = shop
        .state
        .telemetry_service
        .raise_alarm(
            shop.m1,
            "E-1024".to_string(),
            AlarmSeverity::Critical,
            "spindle overload".to_string(),
        )
        .await;
    assert_eq!(report.targeted, 1);
    assert_eq!(report.delivered, 1);

    let Ok(event) = outbox.try_recv() else {
        panic!("alarm should be queued");
    };
    let ShopEvent::AlarmEvent(alarm) = event.as_ref() else {
        panic!("expected an alarm event, got {event:?}");
    };
    assert_eq!(alarm.machine_id, shop.m1);
    assert_eq!(alarm.department_id, Some(shop.mill));
    assert!(outbox.try_recv().is_err(), "alarm must be delivered once");
}

#[tokio::test]
async fn operation_progress_updates_department_subscribers() {
    let shop = common::shop();
    let dispatcher = &shop.state.dispatcher;
    let conn = ConnectionId::new();
    let mut outbox = dispatcher.attach(conn).await;
    dispatcher.registry().join(conn, Topic::Department(shop.mill)).await;

    let Some(op) = shop.j1_ops.get(2).copied() else {
        panic!("fixture has four operations");
    };
    let Ok(Some(report)) = shop
        .state
        .telemetry_service
        .report_operation_progress(shop.j1, op, OperationStatus::Completed)
        .await
    else {
        panic!("job and operation exist");
    };
    assert_eq!(report.delivered, 1);

    let Ok(event) = outbox.try_recv() else {
        panic!("progress should be queued");
    };
    let ShopEvent::JobProgressUpdate(progress) = event.as_ref() else {
        panic!("expected job progress, got {event:?}");
    };
    assert!((progress.percent_complete - 75.0).abs() < 1e-9);
}

#[tokio::test]
async fn detached_connection_leaves_no_subscriptions() {
    let shop = common::shop();
    let dispatcher = &shop.state.dispatcher;
    let conn = ConnectionId::new();
    let _outbox = dispatcher.attach(conn).await;
    dispatcher.registry().join(conn, Topic::Shop).await;
    dispatcher.registry().join(conn, Topic::Machine(shop.m2)).await;

    dispatcher.detach(conn).await;

    assert!(dispatcher.registry().topics_for(conn).await.is_empty());
    assert_eq!(dispatcher.registry().topic_count().await, 0);
    assert_eq!(dispatcher.connection_count().await, 0);
}
