//! Cache read failure policy

use std::str::FromStr;

use serde::de::DeserializeOwned;
use tracing::warn;

use super::errors::CatalogError;
use crate::cache::{self, CacheError, KvStore};

/// What a cache-backend failure on read means for the caller
///
/// A value that exists but no longer decodes is always treated as a miss so
/// the rebuild overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Log and recompute, as if the key were absent
    #[default]
    Miss,
    /// Abort the operation with `CatalogError::Cache`
    Fail,
}

impl ReadFailurePolicy {
    /// Read and decode `key` under this policy
    pub async fn read<T: DeserializeOwned>(
        self,
        store: &dyn KvStore,
        key: &str,
    ) -> Result<Option<T>, CatalogError> {
        match cache::get_json(store, key).await {
            Ok(value) => Ok(value),
            Err(e) => self.recover(key, e),
        }
    }

    /// Read the undecoded value under `key` under this policy
    pub async fn read_raw(
        self,
        store: &dyn KvStore,
        key: &str,
    ) -> Result<Option<String>, CatalogError> {
        match store.get(key).await {
            Ok(value) => Ok(value),
            Err(e) => self.recover(key, e),
        }
    }

    fn recover<T>(self, key: &str, err: CacheError) -> Result<Option<T>, CatalogError> {
        match (err, self) {
            (CacheError::Decode(e), _) => {
                warn!(key = key, error = %e, "Cached value does not decode, treating as miss");
                Ok(None)
            }
            (e, ReadFailurePolicy::Miss) => {
                warn!(key = key, error = %e, "Cache read failed, treating as miss");
                Ok(None)
            }
            (e, ReadFailurePolicy::Fail) => Err(CatalogError::Cache(e)),
        }
    }
}

impl FromStr for ReadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "miss" => Ok(ReadFailurePolicy::Miss),
            "fail" => Ok(ReadFailurePolicy::Fail),
            other => Err(format!("expected 'miss' or 'fail', got '{}'", other)),
        }
    }
}
