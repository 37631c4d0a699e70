//! Configuration for the keyed cache.

use crate::events::CacheEvent;
use crate::KeyedCache;
use scoped_fixtures_core::EventListeners;
use std::hash::Hash;

/// Configuration for a [`KeyedCache`].
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for configuring and constructing a keyed cache.
pub struct CacheConfigBuilder {
    name: String,
    event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a committed entry is returned.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if matches!(event, CacheEvent::Hit { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked when a call has to run its producer.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if matches!(event, CacheEvent::Miss { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked when a producer unwinds without a result.
    pub fn on_abandoned<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if matches!(event, CacheEvent::Abandoned { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked with the number of entries removed by
    /// each `delete_keys` call.
    pub fn on_purge<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if let CacheEvent::Purged { removed, .. } = event {
                f(*removed);
            }
        });
        self
    }

    /// Registers a callback invoked for every event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(f);
        self
    }

    /// Builds the configuration without constructing a cache.
    pub fn into_config(self) -> CacheConfig {
        CacheConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the cache.
    pub fn build<K, V>(self) -> KeyedCache<K, V>
    where
        K: Hash + Eq + Clone,
        V: Clone,
    {
        KeyedCache::with_config(self.into_config())
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
