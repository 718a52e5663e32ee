//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::cache::{CacheStore, StatusCache};
use crate::config::GatewayConfig;
use crate::domain::{BroadcastDispatcher, SubscriptionRegistry};
use crate::metadata::MetadataStore;
use crate::service::{ResponseTtls, ShopService, TelemetryService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read-side queries.
    pub shop_service: Arc<ShopService>,
    /// Status map writes and event publishing.
    pub telemetry_service: Arc<TelemetryService>,
    /// Subscription fan-out for WebSocket connections.
    pub dispatcher: Arc<BroadcastDispatcher>,
}

impl AppState {
    /// Wires the services over the given metadata and cache backends.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        metadata: Arc<dyn MetadataStore>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        let cache = StatusCache::new(cache_store);
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            Arc::new(SubscriptionRegistry::new()),
            config.outbox_capacity,
        ));
        let telemetry_service = Arc::new(TelemetryService::new(
            cache.clone(),
            Arc::clone(&metadata),
            Arc::clone(&dispatcher),
            config.status_ttl,
        ));
        let shop_service = Arc::new(ShopService::new(
            metadata,
            Arc::clone(&telemetry_service),
            cache,
            ResponseTtls {
                departments: config.departments_ttl,
                department: config.department_ttl,
            },
        ));
        Self {
            shop_service,
            telemetry_service,
            dispatcher,
        }
    }
}
