//! Key-value caching layer
//!
//! A small TTL cache seam (`KvStore`) with two backends: a remote REST-backed
//! store for deployment and an in-process Moka store for local runs and tests.
//! Values are stored as JSON text.

pub mod errors;
pub mod memory;
pub mod upstash;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub use errors::CacheError;
pub use memory::{Clock, ManualClock, MemoryStore, SystemClock};
pub use upstash::UpstashStore;

/// Key-value cache with per-entry time-to-live
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value under `key`; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value, for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// Read and decode a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and store a JSON value
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw, ttl).await
}

/// Store a JSON value, logging instead of failing when the backend errors
pub async fn set_json_logged<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    if let Err(e) = set_json(store, key, value, ttl).await {
        warn!(key = key, error = %e, "Cache write failed");
    }
}
