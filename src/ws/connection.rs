//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection: client
//! commands mutate the connection's topic memberships in the
//! [`SubscriptionRegistry`], and events queued in the connection's outbox
//! by the [`BroadcastDispatcher`] are written to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{WsCommand, WsMessage, WsMessageType};
use crate::domain::{BroadcastDispatcher, ConnectionId, ShopEvent, SubscriptionRegistry, Topic};
use crate::error::GatewayError;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and applies them to the registry.
/// - Forwards events from the connection's outbox to the client.
///
/// Every exit path detaches the connection, which also drops all of its
/// topic memberships.
pub async fn run_connection(socket: WebSocket, dispatcher: Arc<BroadcastDispatcher>) {
    let connection = ConnectionId::new();
    let mut outbox = dispatcher.attach(connection).await;
    let registry = Arc::clone(dispatcher.registry());
    let (mut ws_tx, mut ws_rx) = socket.split();
    tracing::info!(%connection, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(text.as_str(), connection, &registry).await;
                        if ws_tx.send(Message::text(reply)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%connection, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Event queued by the dispatcher
            event = outbox.recv() => {
                let Some(event) = event else {
                    break;
                };
                if ws_tx.send(Message::text(event_frame(&event))).await.is_err() {
                    break;
                }
            }
        }
    }

    dispatcher.detach(connection).await;
    tracing::info!(%connection, "ws connection closed");
}

/// Wraps an event in an `event` frame.
fn event_frame(event: &ShopEvent) -> String {
    WsMessage::new(
        uuid::Uuid::new_v4().to_string(),
        WsMessageType::Event,
        serde_json::to_value(event).unwrap_or_default(),
    )
    .to_json()
}

/// Handles a text message from the client, returning the JSON reply.
async fn handle_text_message(
    text: &str,
    connection: ConnectionId,
    registry: &SubscriptionRegistry,
) -> String {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return invalid("", "malformed JSON".to_string());
    };
    if msg.msg_type != WsMessageType::Command {
        return invalid(&msg.id, "expected a command frame".to_string());
    }
    let command = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(command) => command,
        Err(e) => return invalid(&msg.id, format!("unknown command: {e}")),
    };

    let payload = match command {
        WsCommand::Subscribe {
            topic_kind,
            topic_id,
        } => {
            let topic = match Topic::from_parts(topic_kind, topic_id.as_deref()) {
                Ok(topic) => topic,
                Err(e) => return gateway_error(&msg.id, &GatewayError::from(e)),
            };
            subscribe(connection, topic, registry).await
        }
        WsCommand::SubscribeShop => subscribe(connection, Topic::Shop, registry).await,
        WsCommand::Unsubscribe {
            topic_kind,
            topic_id,
        } => {
            let topic = match Topic::from_parts(topic_kind, topic_id.as_deref()) {
                Ok(topic) => topic,
                Err(e) => return gateway_error(&msg.id, &GatewayError::from(e)),
            };
            let left = registry.leave(connection, topic).await;
            tracing::info!(%connection, %topic, "ws client unsubscribed");
            serde_json::json!({
                "unsubscribed": topic,
                "changed": left,
                "topics": sorted_topics(connection, registry).await,
            })
        }
        WsCommand::UnsubscribeAll => {
            let removed = registry.remove_connection(connection).await;
            tracing::info!(%connection, removed = removed.len(), "ws client unsubscribed from all");
            serde_json::json!({
                "removed": removed.len(),
                "topics": Vec::<Topic>::new(),
            })
        }
    };

    WsMessage::new(msg.id, WsMessageType::Response, payload).to_json()
}

async fn subscribe(
    connection: ConnectionId,
    topic: Topic,
    registry: &SubscriptionRegistry,
) -> serde_json::Value {
    let joined = registry.join(connection, topic).await;
    tracing::info!(%connection, %topic, "ws client subscribed");
    serde_json::json!({
        "subscribed": topic,
        "changed": joined,
        "topics": sorted_topics(connection, registry).await,
    })
}

async fn sorted_topics(connection: ConnectionId, registry: &SubscriptionRegistry) -> Vec<Topic> {
    let mut topics: Vec<Topic> = registry.topics_for(connection).await.into_iter().collect();
    topics.sort();
    topics
}

fn invalid(id: &str, message: String) -> String {
    gateway_error(id, &GatewayError::InvalidRequest(message))
}

fn gateway_error(id: &str, err: &GatewayError) -> String {
    WsMessage::error(id, err.error_code(), err.to_string()).to_json()
}
