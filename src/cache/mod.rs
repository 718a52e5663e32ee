//! Status cache: a key/value store with per-key expiry.
//!
//! [`CacheStore`] is the raw contract (opaque string values, last writer
//! wins, no versioning). [`StatusCache`] layers JSON (de)serialization on
//! top and implements the degrade rules: a failed read is a miss, a
//! failed write is logged and dropped.

pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::InMemoryCache;

use crate::domain::DepartmentId;

/// Cache key layout shared with other readers of the store.
pub mod keys {
    use super::DepartmentId;

    /// Every department DTO, as one list.
    pub const DEPARTMENTS_ALL: &str = "departments:all";

    /// Latest status of every machine, as one map keyed by machine id.
    pub const MACHINE_STATUSES: &str = "machine_statuses:current";

    /// A single department DTO.
    #[must_use]
    pub fn department(id: DepartmentId) -> String {
        format!("department:{id}")
    }
}

/// Errors raised by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be encoded or decoded.
    #[error("cache value encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Raw key/value store with optional per-key time-to-live.
///
/// Implementations must be safe for concurrent readers and writers and
/// provide atomicity per key. Values are opaque to the store.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Returns the value stored under `key`, or `None` on a miss or after
    /// the entry expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Removes `key`. Returns `true` if a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Returns `true` if `key` holds a live entry.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

/// Typed view over a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct StatusCache {
    store: Arc<dyn CacheStore>,
}

impl StatusCache {
    /// Wraps a raw store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Reads and decodes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the store fails, or
    /// [`CacheError::Encoding`] if the stored value does not decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes `value` and stores it under `key` with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Encoding`] if `value` cannot be encoded, or
    /// [`CacheError::Unavailable`] if the store fails.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw, Some(ttl)).await
    }

    /// Like [`StatusCache::get_json`] but treats any failure as a miss.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get_json(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Like [`StatusCache::set_json`] but logs and drops failures.
    ///
    /// Returns `true` if the value was stored.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match self.set_json(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache write failed; continuing without it");
                false
            }
        }
    }
}
