//! In-process TTL Store
//!
//! Moka-backed implementation of `KvStore` for local runs and tests.
//! Expiry is decided against an injectable `Clock`, so TTL boundaries can be
//! exercised without sleeping; Moka's own per-entry expiry reclaims memory in
//! real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;
use tracing::{debug, trace};

use super::{CacheError, KvStore};

/// Default maximum number of entries
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Longest TTL handed to Moka's own eviction; longer entries rely on capacity
const LONGEST_EVICTION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Source of the current time for expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// A stored value with its expiry; `None` never expires
#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Gives every entry its own time-to-live, reset on overwrite
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process key-value store with per-entry TTL
pub struct MemoryStore {
    /// Stored values by key
    entries: Cache<String, StoredValue>,
    /// Time source for expiry checks
    clock: Arc<dyn Clock>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl MemoryStore {
    /// Create a store on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose expiry follows `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(DEFAULT_MAX_ENTRIES)
            .expire_after(PerEntryTtl)
            .name("kv_store")
            .build();

        Self {
            entries,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Read a live value
    ///
    /// Expired entries are left for Moka to evict; removing them here could
    /// race with a concurrent `set` of the same key.
    fn lookup(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(stored) if stored.is_live(self.clock.now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Store HIT");
                Some(stored.value)
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Store MISS (expired)");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Store MISS");
                None
            }
        }
    }

    /// Get store statistics
    ///
    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    /// Log current store metrics
    pub fn log_metrics(&self) {
        let (hits, misses, hit_rate) = self.stats();
        debug!(
            hits = hits,
            misses = misses,
            hit_rate = format!("{:.1}%", hit_rate),
            entries = self.entries.entry_count(),
            "Store metrics"
        );
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        // A TTL past the clock's range never expires
        let expires_at = self.clock.now().checked_add(ttl);
        let stored = StoredValue {
            value,
            ttl: Some(ttl).filter(|t| *t <= LONGEST_EVICTION),
            expires_at,
        };
        self.entries.insert(key.to_string(), stored);
        debug!(key = key, ttl_secs = ttl.as_secs(), "Stored value");
        Ok(())
    }
}
