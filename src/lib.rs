//! # shopfloor-gateway
//!
//! Live state gateway for shop-floor visualization clients.
//!
//! Machine telemetry is ingested into a short-lived status cache,
//! combined with department, machine, and job metadata into aggregate
//! views (department utilization, job progress, NPI workflow timelines),
//! and pushed to WebSocket clients subscribed to `machine:<id>`,
//! `department:<id>`, or `shop` topics.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)         Telemetry producers
//!     │                                   │
//!     ├── REST Handlers (api/)  ◄─────────┘
//!     ├── WS Handler (ws/)
//!     │
//!     ├── ShopService / TelemetryService (service/)
//!     ├── Aggregator (service/aggregator)
//!     │
//!     ├── SubscriptionRegistry + BroadcastDispatcher (domain/)
//!     ├── StatusCache (cache/)
//!     │
//!     └── MetadataStore (metadata/): in-memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod service;
pub mod ws;
