//! Domain layer: entity model, topics, events, and the subscription
//! fan-out machinery.
//!
//! Entities (departments, machines, jobs) are read-only snapshots from the
//! metadata store. Live state lives elsewhere: machine statuses in the
//! status cache, topic membership in the [`SubscriptionRegistry`], and
//! in-flight events in the [`BroadcastDispatcher`] outboxes. The [`view`]
//! module holds the read models that join the two for clients.

pub mod department;
pub mod dispatcher;
pub mod ids;
pub mod job;
pub mod machine;
pub mod shop_event;
pub mod subscription_registry;
pub mod topic;
pub mod view;

pub use department::{Department, DepartmentLayout, DepartmentType};
pub use dispatcher::{BroadcastDispatcher, DispatchReport, Outbox};
pub use ids::{ConnectionId, DepartmentId, JobId, MachineId, OperationId};
pub use job::{
    DepartmentRef, JobRouting, JobStatus, JobType, MachineRef, Operation, OperationStatus,
};
pub use machine::{
    CurrentWork, Machine, MachineCapabilities, MachineStatus, MachineStatusSnapshot, MachineType,
    Position,
};
pub use shop_event::{
    AlarmEventMessage, AlarmSeverity, JobProgressUpdateMessage, MachineStatusUpdateMessage,
    ShopEvent,
};
pub use subscription_registry::SubscriptionRegistry;
pub use topic::{Topic, TopicKind, TopicParseError};
pub use view::{
    DepartmentMetrics, DepartmentView, JobProgress, JobRoutingView, MachineLocation, MachineView,
    WorkflowStep, WorkflowTimeline, WorkflowVisualization,
};
