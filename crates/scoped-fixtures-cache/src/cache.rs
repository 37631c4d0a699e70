//! The at-most-once keyed cache.

use crate::config::CacheConfig;
use crate::events::CacheEvent;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use scoped_fixtures_core::{CacheKey, CachedResult, FixtureError, FixtureValue};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Per-key execution lock. Only held while a producer runs.
type ExecLock = Arc<Mutex<()>>;

/// Entry and execution-lock tables, guarded together by one structural lock.
struct Tables<K, V> {
    store: HashMap<K, CachedResult<V>>,
    exec_locks: HashMap<K, ExecLock>,
}

/// Memoizing cache that runs each key's producer at most once.
///
/// Concurrent callers for the same key block on that key's execution lock
/// and then observe the committed result; callers for different keys never
/// wait on each other's producers. The structural lock is held only for map
/// operations, never across a producer call.
///
/// Committed entries live until [`delete_keys`](Self::delete_keys) removes
/// them. There is no eviction, TTL or size bound.
pub struct KeyedCache<K = CacheKey, V = FixtureValue> {
    tables: RwLock<Tables<K, V>>,
    config: CacheConfig,
}

impl<K, V> KeyedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates an empty cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates an empty cache with the given configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "fixture_cache_requests_total",
                "Total number of fixture cache lookups (hits and misses)"
            );
            describe_counter!(
                "fixture_cache_abandoned_total",
                "Total number of producers that unwound without returning"
            );
            describe_counter!(
                "fixture_cache_purged_total",
                "Total number of entries removed at scope teardown or invalidation"
            );
            describe_gauge!("fixture_cache_size", "Current number of committed entries");
        }

        Self {
            tables: RwLock::new(Tables {
                store: HashMap::new(),
                exec_locks: HashMap::new(),
            }),
            config,
        }
    }

    /// Returns the configured name of this cache.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the committed result for `key`, if any.
    pub fn get(&self, key: &K) -> Option<CachedResult<V>> {
        self.tables.read().store.get(key).cloned()
    }

    /// Returns true if `key` has a committed result.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tables.read().store.contains_key(key)
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.tables.read().store.len()
    }

    /// Returns true if no entry is committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of execution-lock rows currently allocated.
    pub fn lock_count(&self) -> usize {
        self.tables.read().exec_locks.len()
    }

    /// Returns the result for `key`, running `produce` if nothing is committed.
    ///
    /// Each call records exactly one hit or miss. A caller that waited on
    /// another caller's producer counts as a hit.
    ///
    /// `produce` runs at most once per key for the lifetime of the entry. If
    /// it unwinds, the key is committed as [`FixtureError::Abandoned`] before
    /// the panic continues, so callers waiting on the same key are released
    /// with that error instead of blocking forever.
    pub fn fetch_or_populate<F>(&self, key: &K, produce: F) -> CachedResult<V>
    where
        F: FnOnce() -> CachedResult<V>,
    {
        if let Some(result) = self.get(key) {
            self.record_hit();
            return result;
        }

        let exec_lock = self.exec_lock(key);
        let _exec = exec_lock.lock();

        // The previous holder may have committed while we waited.
        if let Some(result) = self.get(key) {
            self.record_hit();
            return result;
        }
        self.record_miss();

        // Declared after `_exec` so it drops (and commits) before the
        // execution lock is released.
        let mut finalizer = Finalizer {
            cache: self,
            key,
            armed: true,
        };

        let result = produce();
        self.commit(key, result.clone());
        finalizer.armed = false;

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, failed = result.is_err(), "fixture produced");

        self.config.event_listeners.emit(&CacheEvent::Produced {
            cache_name: self.config.name.clone(),
            timestamp: Instant::now(),
            failed: result.is_err(),
        });

        result
    }

    /// Removes the entries and execution locks of `keys`.
    ///
    /// Waits for in-flight readers of the structural lock. Keys without an
    /// entry are ignored. Returns the number of entries removed.
    ///
    /// Deleting a key whose producer is still running does not stop that
    /// producer; it commits when it returns and the key comes back. Scopes
    /// are expected to tear down only after their fixtures finished.
    pub fn delete_keys<'a, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let (removed, size) = {
            let mut tables = self.tables.write();
            let mut removed = 0;
            for key in keys {
                if tables.store.remove(key).is_some() {
                    removed += 1;
                }
                tables.exec_locks.remove(key);
            }
            (removed, tables.store.len())
        };

        #[cfg(feature = "metrics")]
        {
            counter!("fixture_cache_purged_total", "cache" => self.config.name.clone())
                .increment(removed as u64);
            gauge!("fixture_cache_size", "cache" => self.config.name.clone()).set(size as f64);
        }

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, removed, remaining = size, "fixture keys purged");

        #[cfg(not(any(feature = "metrics", feature = "tracing")))]
        let _ = size;

        self.config.event_listeners.emit(&CacheEvent::Purged {
            cache_name: self.config.name.clone(),
            timestamp: Instant::now(),
            removed,
        });

        removed
    }

    fn exec_lock(&self, key: &K) -> ExecLock {
        let mut tables = self.tables.write();
        Arc::clone(tables.exec_locks.entry(key.clone()).or_default())
    }

    fn commit(&self, key: &K, result: CachedResult<V>) {
        let mut tables = self.tables.write();
        tables.store.insert(key.clone(), result);

        #[cfg(feature = "metrics")]
        gauge!("fixture_cache_size", "cache" => self.config.name.clone())
            .set(tables.store.len() as f64);
    }

    fn record_hit(&self) {
        #[cfg(feature = "metrics")]
        counter!("fixture_cache_requests_total", "cache" => self.config.name.clone(), "result" => "hit")
            .increment(1);

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, "fixture cache hit");

        self.config.event_listeners.emit(&CacheEvent::Hit {
            cache_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn record_miss(&self) {
        #[cfg(feature = "metrics")]
        counter!("fixture_cache_requests_total", "cache" => self.config.name.clone(), "result" => "miss")
            .increment(1);

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, "fixture cache miss");

        self.config.event_listeners.emit(&CacheEvent::Miss {
            cache_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for KeyedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("KeyedCache")
            .field("name", &self.config.name)
            .field("entries", &tables.store.len())
            .field("exec_locks", &tables.exec_locks.len())
            .finish()
    }
}

/// Commits an abandoned result if the producer never returned.
struct Finalizer<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    cache: &'a KeyedCache<K, V>,
    key: &'a K,
    armed: bool,
}

impl<K, V> Drop for Finalizer<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        self.cache.commit(self.key, Err(FixtureError::Abandoned));

        #[cfg(feature = "metrics")]
        counter!("fixture_cache_abandoned_total", "cache" => self.cache.config.name.clone())
            .increment(1);

        #[cfg(feature = "tracing")]
        warn!(cache = %self.cache.config.name, "fixture producer abandoned without a result");

        self.cache.config.event_listeners.emit(&CacheEvent::Abandoned {
            cache_name: self.cache.config.name.clone(),
            timestamp: Instant::now(),
        });
    }
}
