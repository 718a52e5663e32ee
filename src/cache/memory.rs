//! In-process [`CacheStore`] backed by a `HashMap`.
//!
//! Expiry is lazy: an expired entry is treated as absent on read and is
//! physically removed on the next write to it, on `delete`, or by
//! [`InMemoryCache::purge_expired`]. Time is taken from
//! [`tokio::time::Instant`] so paused-clock tests can step past a TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Process-local cache with per-key TTL.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Returns the number of stored entries, including expired ones not
    /// yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }
}
