//! Event types for the keyed cache.

use scoped_fixtures_core::FixtureEvent;
use std::time::Instant;

/// Events emitted by a [`KeyedCache`](crate::KeyedCache).
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A committed entry was returned without running a producer.
    Hit {
        /// The name of the cache instance.
        cache_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// No entry existed once the execution lock was held; the caller produces.
    Miss {
        /// The name of the cache instance.
        cache_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A producer returned and its result was committed.
    Produced {
        /// The name of the cache instance.
        cache_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Whether the committed result is an error.
        failed: bool,
    },
    /// A producer unwound without returning; a terminal error was committed.
    Abandoned {
        /// The name of the cache instance.
        cache_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// Keys were removed by `delete_keys`.
    Purged {
        /// The name of the cache instance.
        cache_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Number of entries actually removed.
        removed: usize,
    },
}

impl CacheEvent {
    /// When the event occurred.
    pub fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Produced { timestamp, .. }
            | CacheEvent::Abandoned { timestamp, .. }
            | CacheEvent::Purged { timestamp, .. } => *timestamp,
        }
    }
}

impl FixtureEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "cache_hit",
            CacheEvent::Miss { .. } => "cache_miss",
            CacheEvent::Produced { .. } => "cache_produced",
            CacheEvent::Abandoned { .. } => "cache_abandoned",
            CacheEvent::Purged { .. } => "cache_purged",
        }
    }

    fn cache_name(&self) -> &str {
        match self {
            CacheEvent::Hit { cache_name, .. }
            | CacheEvent::Miss { cache_name, .. }
            | CacheEvent::Produced { cache_name, .. }
            | CacheEvent::Abandoned { cache_name, .. }
            | CacheEvent::Purged { cache_name, .. } => cache_name,
        }
    }
}
