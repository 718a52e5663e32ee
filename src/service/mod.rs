//! Service layer: business logic orchestration.
//!
//! [`TelemetryService`] owns the live status map and publishes events
//! through the [`crate::domain::BroadcastDispatcher`]. [`ShopService`]
//! answers read requests by combining entity metadata with that map via
//! the pure functions in [`aggregator`].

pub mod aggregator;
pub mod shop_service;
pub mod telemetry_service;

pub use aggregator::StatusMap;
pub use shop_service::{ResponseTtls, ShopService};
pub use telemetry_service::{StatusRecorded, TelemetryService};

use crate::error::GatewayError;
use crate::metadata::MetadataError;

/// Logs a metadata failure with its entity context and wraps it.
fn metadata_failure(
    entity: &'static str,
    id: impl std::fmt::Display,
    source: MetadataError,
) -> GatewayError {
    let id = id.to_string();
    tracing::error!(entity, id = %id, error = %source, "metadata store failure");
    GatewayError::infrastructure(entity, id, source)
}
