//! Topic membership of live connections.
//!
//! [`SubscriptionRegistry`] keeps two indices, topic → connections and
//! connection → topics, behind a single [`tokio::sync::RwLock`]. Every
//! mutation updates both under the same write guard, so readers never
//! observe a join that is present in one index but not the other.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::{ConnectionId, Topic};

#[derive(Debug, Default)]
struct Indices {
    by_topic: HashMap<Topic, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<Topic>>,
}

impl Indices {
    fn detach_topic(&mut self, connection: ConnectionId, topic: &Topic) {
        if let Some(members) = self.by_topic.get_mut(topic) {
            members.remove(&connection);
            if members.is_empty() {
                self.by_topic.remove(topic);
            }
        }
    }
}

/// Registry of which connection listens on which topic.
///
/// # Concurrency
///
/// - Reads (`connections_for`, `topics_for`, ...) run concurrently.
/// - Join, leave and removal are serialized by the registry lock only;
///   they never wait on delivery or I/O.
/// - Join and leave are idempotent.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    indices: RwLock<Indices>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to `topic`.
    ///
    /// Returns `true` if the membership is new, `false` if it already
    /// existed (in which case nothing changes).
    pub async fn join(&self, connection: ConnectionId, topic: Topic) -> bool {
        let mut indices = self.indices.write().await;
        let added = indices
            .by_connection
            .entry(connection)
            .or_default()
            .insert(topic);
        if added {
            indices.by_topic.entry(topic).or_default().insert(connection);
        }
        added
    }

    /// Removes `connection` from `topic`.
    ///
    /// Returns `true` if the connection was a member. Leaving a topic that
    /// was never joined is a no-op.
    pub async fn leave(&self, connection: ConnectionId, topic: Topic) -> bool {
        let mut indices = self.indices.write().await;
        let removed = indices
            .by_connection
            .get_mut(&connection)
            .is_some_and(|topics| topics.remove(&topic));
        if removed {
            indices.detach_topic(connection, &topic);
            if indices
                .by_connection
                .get(&connection)
                .is_some_and(HashSet::is_empty)
            {
                indices.by_connection.remove(&connection);
            }
        }
        removed
    }

    /// Returns the topics `connection` has joined.
    pub async fn topics_for(&self, connection: ConnectionId) -> HashSet<Topic> {
        self.indices
            .read()
            .await
            .by_connection
            .get(&connection)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the connections currently joined to `topic`.
    pub async fn connections_for(&self, topic: &Topic) -> HashSet<ConnectionId> {
        self.indices
            .read()
            .await
            .by_topic
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the union of connections joined to any of `topics`, taken
    /// from a single consistent snapshot.
    pub async fn connections_for_any(&self, topics: &[Topic]) -> HashSet<ConnectionId> {
        let indices = self.indices.read().await;
        topics
            .iter()
            .filter_map(|topic| indices.by_topic.get(topic))
            .flatten()
            .copied()
            .collect()
    }

    /// Drops every membership of `connection`.
    ///
    /// Cost is proportional to the number of topics the connection had
    /// joined. Returns the topics that were removed.
    pub async fn remove_connection(&self, connection: ConnectionId) -> HashSet<Topic> {
        let mut indices = self.indices.write().await;
        let topics = indices
            .by_connection
            .remove(&connection)
            .unwrap_or_default();
        for topic in &topics {
            indices.detach_topic(connection, topic);
        }
        topics
    }

    /// Returns every connection that has joined at least one topic.
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.indices
            .read()
            .await
            .by_connection
            .keys()
            .copied()
            .collect()
    }

    /// Returns the number of topics with at least one member.
    pub async fn topic_count(&self) -> usize {
        self.indices.read().await.by_topic.len()
    }
}
