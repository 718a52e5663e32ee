//! WebSocket layer: connection handling and subscription commands.
//!
//! The WebSocket endpoint at `/ws` lets visualization clients join and
//! leave topics (`machine:<id>`, `department:<id>`, `shop`) and receive
//! the matching events as they happen.

pub mod connection;
pub mod handler;
pub mod messages;
