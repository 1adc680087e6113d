//! Single-flight coordination
//!
//! Collapses concurrent computations for the same key into one. The first
//! caller spawns the work on its own task; later callers for the same key
//! await a shared handle to that task's result. Because the work runs
//! detached, a caller that goes away never cancels it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::errors::CatalogError;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, CatalogError>>>;

type Registry<T> = Arc<Mutex<HashMap<String, SharedResult<T>>>>;

/// At most one in-flight computation per key
pub struct SingleFlight<T> {
    in_flight: Registry<T>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the computation already running for it
    ///
    /// `work` is dropped unpolled when another caller's computation is joined.
    /// The key is released when the work finishes, panics or is aborted, so
    /// the next caller always starts afresh.
    pub async fn run<F>(&self, key: &str, work: F) -> Result<T, CatalogError>
    where
        F: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(key) {
                Some(existing) => {
                    debug!(key = key, "Joining in-flight computation");
                    existing.clone()
                }
                None => {
                    // Its drop takes this lock, so removal always follows the insert
                    let release = Release {
                        registry: Arc::clone(&self.in_flight),
                        key: key.to_string(),
                    };
                    let handle = tokio::spawn(async move {
                        let _release = release;
                        work.await
                    });

                    let shared = async move { handle.await? }.boxed().shared();
                    in_flight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of keys with a computation in progress
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Drops a key from the registry when the spawned work ends
struct Release<T> {
    registry: Registry<T>,
    key: String,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.key);
    }
}

/// The map stays consistent across a panic, so a poisoned lock is still usable
fn lock<T>(registry: &Registry<T>) -> MutexGuard<'_, HashMap<String, SharedResult<T>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
