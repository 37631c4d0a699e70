//! At-most-once memoizing cache for test fixtures.
//!
//! [`KeyedCache`] maps an opaque key to the result of a producer and
//! guarantees the producer for a key runs at most once, no matter how many
//! threads ask for that key at the same time.
//!
//! # How It Works
//!
//! 1. A caller looks the key up under a shared hold of the structural lock
//! 2. On a miss it takes the key's execution lock; concurrent callers for the
//!    same key queue behind it
//! 3. The lock holder re-checks, runs the producer without the structural
//!    lock, and commits the result
//! 4. Queued callers wake up, find the committed result and return it
//!
//! Errors are cached exactly like values and replayed to every caller. A
//! producer that unwinds commits [`FixtureError::Abandoned`] through a drop
//! guard, so nobody waits forever on a dead producer.
//!
//! # Example
//!
//! ```rust
//! use scoped_fixtures_cache::KeyedCache;
//! use scoped_fixtures_core::CacheKey;
//!
//! let cache: KeyedCache<CacheKey, u16> = KeyedCache::new();
//! let key = CacheKey::from("http-port");
//!
//! let port = cache.fetch_or_populate(&key, || Ok(8080)).unwrap();
//! // Second call never runs its producer.
//! let again = cache.fetch_or_populate(&key, || unreachable!()).unwrap();
//! assert_eq!(port, again);
//!
//! cache.delete_keys([&key]);
//! assert!(cache.is_empty());
//! ```
//!
//! # Prior Art
//!
//! The per-key locking is the same idea as singleflight / request
//! coalescing, except the result outlives the in-flight window and stays
//! cached until its keys are deleted.

mod cache;
mod config;
mod events;

pub use cache::KeyedCache;
pub use config::{CacheConfig, CacheConfigBuilder};
pub use events::CacheEvent;

pub use scoped_fixtures_core::{CacheKey, CachedResult, FixtureError, FixtureValue};
