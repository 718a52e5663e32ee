//! WebSocket message types: envelope, commands, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TopicKind;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    #[serde(default)]
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp; defaults to the time of receipt for commands.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server frame stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error frame with a numeric code and message.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({
                "code": code,
                "message": message.into(),
            }),
        )
    }

    /// Serializes the frame to JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket, carried in the
/// payload of a `command` frame.
///
/// ```json
/// {"id":"1","type":"command","payload":{"command":"subscribe","topic_kind":"machine","topic_id":"<uuid>"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Join a topic.
    Subscribe {
        /// Kind of topic.
        topic_kind: TopicKind,
        /// Machine or department id; ignored for `shop`.
        #[serde(default)]
        topic_id: Option<String>,
    },
    /// Leave a topic.
    Unsubscribe {
        /// Kind of topic.
        topic_kind: TopicKind,
        /// Machine or department id; ignored for `shop`.
        #[serde(default)]
        topic_id: Option<String>,
    },
    /// Join the shop-wide topic.
    SubscribeShop,
    /// Leave every topic but stay connected.
    UnsubscribeAll,
}
