//! Topic-scoped fan-out of [`ShopEvent`]s to live connections.
//!
//! Each attached connection owns a bounded [`tokio::sync::mpsc`] queue
//! (its outbox). [`BroadcastDispatcher::dispatch`] resolves the event's
//! topics through the [`SubscriptionRegistry`], unions the members, and
//! enqueues the event once per connection with `try_send`. A full or
//! closed outbox is counted and logged; it never holds up delivery to the
//! other connections. The connection's own writer task drains the outbox
//! onto the socket, so a slow peer only ever stalls itself.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use super::{ConnectionId, ShopEvent, SubscriptionRegistry};

/// Receiving half of a connection's outbox.
pub type Outbox = mpsc::Receiver<Arc<ShopEvent>>;

/// Outcome of a single [`BroadcastDispatcher::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Distinct connections subscribed to at least one matching topic.
    pub targeted: usize,
    /// Connections the event was enqueued for.
    pub delivered: usize,
    /// Connections skipped because their outbox was full.
    pub dropped: usize,
    /// Connections skipped because their outbox was closed or missing.
    pub stale: usize,
}

/// Fans events out to the connections subscribed to their topics.
#[derive(Debug)]
pub struct BroadcastDispatcher {
    registry: Arc<SubscriptionRegistry>,
    outboxes: RwLock<HashMap<ConnectionId, mpsc::Sender<Arc<ShopEvent>>>>,
    outbox_capacity: usize,
}

impl BroadcastDispatcher {
    /// Creates a dispatcher whose outboxes hold up to `outbox_capacity`
    /// undelivered events each.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>, outbox_capacity: usize) -> Self {
        Self {
            registry,
            outboxes: RwLock::new(HashMap::new()),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Returns the subscription registry used for topic resolution.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Registers a connection and returns the receiving end of its outbox.
    ///
    /// Attaching an already attached connection replaces its outbox; the
    /// previous receiver sees the channel close.
    pub async fn attach(&self, connection: ConnectionId) -> Outbox {
        let (tx, rx) = mpsc::channel(self.outbox_capacity);
        self.outboxes.write().await.insert(connection, tx);
        tracing::debug!(%connection, "connection attached");
        rx
    }

    /// Forgets a connection: drops its outbox and every topic membership.
    pub async fn detach(&self, connection: ConnectionId) {
        self.outboxes.write().await.remove(&connection);
        let topics = self.registry.remove_connection(connection).await;
        tracing::debug!(%connection, topics = topics.len(), "connection detached");
    }

    /// Delivers `event` once to every connection subscribed to any of its
    /// topics.
    ///
    /// Connections that join after this call returns never see the event.
    pub async fn dispatch(&self, event: ShopEvent) -> DispatchReport {
        let topics = event.topics();
        let targets = self.registry.connections_for_any(&topics).await;
        let mut report = DispatchReport {
            targeted: targets.len(),
            ..DispatchReport::default()
        };
        if targets.is_empty() {
            return report;
        }

        let event = Arc::new(event);
        let outboxes = self.outboxes.read().await;
        for connection in targets {
            let Some(tx) = outboxes.get(&connection) else {
                report.stale += 1;
                continue;
            };
            match tx.try_send(Arc::clone(&event)) {
                Ok(()) => report.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        %connection,
                        event_type = event.event_type_str(),
                        "outbox full; event dropped for slow connection"
                    );
                    report.dropped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => report.stale += 1,
            }
        }
        drop(outboxes);

        tracing::trace!(
            event_type = event.event_type_str(),
            targeted = report.targeted,
            delivered = report.delivered,
            "event dispatched"
        );
        report
    }

    /// Removes registry entries whose connection has no live outbox.
    ///
    /// Disconnects detach promptly on their own; this pass only catches
    /// connections whose task ended without detaching. Returns the number
    /// of connections removed.
    pub async fn reconcile(&self) -> usize {
        let mut orphaned = Vec::new();
        {
            let mut outboxes = self.outboxes.write().await;
            outboxes.retain(|connection, tx| {
                let open = !tx.is_closed();
                if !open {
                    orphaned.push(*connection);
                }
                open
            });
            for connection in self.registry.connection_ids().await {
                if !outboxes.contains_key(&connection) {
                    orphaned.push(connection);
                }
            }
        }

        for connection in &orphaned {
            self.registry.remove_connection(*connection).await;
        }
        if !orphaned.is_empty() {
            tracing::info!(removed = orphaned.len(), "reconciled orphaned subscriptions");
        }
        orphaned.len()
    }

    /// Returns the number of attached connections.
    pub async fn connection_count(&self) -> usize {
        self.outboxes.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{
        AlarmEventMessage, AlarmSeverity, MachineId, MachineStatus, MachineStatusUpdateMessage,
        Topic,
    };

    fn dispatcher(capacity: usize) -> BroadcastDispatcher {
        BroadcastDispatcher::new(Arc::new(SubscriptionRegistry::new()), capacity)
    }

    fn status_event(machine_id: MachineId, utilization: f64) -> ShopEvent {
        ShopEvent::MachineStatusUpdate(MachineStatusUpdateMessage {
            machine_id,
            machine_name: "Okuma LB3000".to_string(),
            department_id: None,
            status: MachineStatus::Running,
            utilization_percent: utilization,
            spindle_load: Some(40.0),
            timestamp: Utc::now(),
        })
    }

    fn alarm_event(machine_id: MachineId) -> ShopEvent {
        ShopEvent::AlarmEvent(AlarmEventMessage {
            machine_id,
            machine_name: "Okuma LB3000".to_string(),
            department_id: None,
            alarm_code: "EX0123".to_string(),
            severity: AlarmSeverity::Warning,
            message: "coolant low".to_string(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_reaches_nobody() {
        let dispatcher = dispatcher(8);
        let report = dispatcher.dispatch(status_event(MachineId::new(), 50.0)).await;
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn overlapping_topics_deliver_once() {
        let dispatcher = dispatcher(8);
        let machine = MachineId::new();
        let conn = ConnectionId::new();
        let mut inbox = dispatcher.attach(conn).await;
        dispatcher.registry().join(conn, Topic::Machine(machine)).await;
        dispatcher.registry().join(conn, Topic::Shop).await;

        let report = dispatcher.dispatch(alarm_event(machine)).await;
        assert_eq!(report.targeted, 1);
        assert_eq!(report.delivered, 1);

        let Ok(event) = inbox.try_recv() else {
            panic!("expected one event");
        };
        assert_eq!(event.event_type_str(), "alarm_event");
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn unrelated_machine_subscribers_are_skipped() {
        let dispatcher = dispatcher(8);
        let conn = ConnectionId::new();
        let mut inbox = dispatcher.attach(conn).await;
        dispatcher
            .registry()
            .join(conn, Topic::Machine(MachineId::new()))
            .await;

        let report = dispatcher.dispatch(status_event(MachineId::new(), 10.0)).await;
        assert_eq!(report.targeted, 0);
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_outbox_does_not_block_others() {
        let dispatcher = dispatcher(1);
        let machine = MachineId::new();
        let slow = ConnectionId::new();
        let fast = ConnectionId::new();
        let _slow_inbox = dispatcher.attach(slow).await;
        let mut fast_inbox = dispatcher.attach(fast).await;
        dispatcher.registry().join(slow, Topic::Shop).await;
        dispatcher.registry().join(fast, Topic::Shop).await;

        dispatcher.dispatch(status_event(machine, 1.0)).await;
        let _ = fast_inbox.recv().await;

        let report = dispatcher.dispatch(status_event(machine, 2.0)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(fast_inbox.try_recv().is_ok());
    }

    #[tokio::test]
    async fn events_arrive_in_dispatch_order() {
        let dispatcher = dispatcher(16);
        let machine = MachineId::new();
        let conn = ConnectionId::new();
        let mut inbox = dispatcher.attach(conn).await;
        dispatcher.registry().join(conn, Topic::Machine(machine)).await;

        for i in 0_u32..5 {
            dispatcher.dispatch(status_event(machine, f64::from(i) * 10.0)).await;
        }

        for i in 0_u32..5 {
            let Some(event) = inbox.recv().await else {
                panic!("missing event {i}");
            };
            let ShopEvent::MachineStatusUpdate(ref msg) = *event else {
                panic!("unexpected event type");
            };
            assert!((msg.utilization_percent - f64::from(i) * 10.0).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn late_joiner_gets_no_replay() {
        let dispatcher = dispatcher(8);
        let machine = MachineId::new();
        dispatcher.dispatch(status_event(machine, 5.0)).await;

        let conn = ConnectionId::new();
        let mut inbox = dispatcher.attach(conn).await;
        dispatcher.registry().join(conn, Topic::Shop).await;
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn detach_removes_memberships() {
        let dispatcher = dispatcher(8);
        let conn = ConnectionId::new();
        let _inbox = dispatcher.attach(conn).await;
        dispatcher.registry().join(conn, Topic::Shop).await;
        assert_eq!(dispatcher.connection_count().await, 1);

        dispatcher.detach(conn).await;
        assert_eq!(dispatcher.connection_count().await, 0);
        assert!(dispatcher.registry().topics_for(conn).await.is_empty());
    }

    #[tokio::test]
    async fn reconcile_drops_closed_connections() {
        let dispatcher = dispatcher(8);
        let gone = ConnectionId::new();
        let alive = ConnectionId::new();
        let orphan = ConnectionId::new();
        let inbox = dispatcher.attach(gone).await;
        let _alive_inbox = dispatcher.attach(alive).await;
        dispatcher.registry().join(gone, Topic::Shop).await;
        dispatcher.registry().join(alive, Topic::Shop).await;
        dispatcher.registry().join(orphan, Topic::Shop).await;
        drop(inbox);

        assert_eq!(dispatcher.reconcile().await, 2);
        let shop = dispatcher.registry().connections_for(&Topic::Shop).await;
        assert_eq!(shop.len(), 1);
        assert!(shop.contains(&alive));
    }
}
