//! Core infrastructure for scoped-fixtures.
//!
//! This crate provides the pieces shared by the cache and the environment crates:
//! - [`CacheKey`], the opaque identity of a memoized fixture
//! - [`FixtureValue`], the type-erased value stored for a key
//! - [`FixtureError`], the error replayed to every caller of a failed fixture
//! - Event system for observability

pub mod error;
pub mod events;
pub mod key;

use std::any::Any;
use std::sync::Arc;

pub use error::FixtureError;
pub use events::{EventListeners, FixtureEvent};
pub use key::CacheKey;

/// Type-erased fixture value as stored in the cache.
///
/// Type recovery happens at the call site with [`Arc::downcast`].
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

/// Result committed for a cache key: either the produced value or the
/// terminal error every caller of that key observes.
pub type CachedResult<V = FixtureValue> = Result<V, FixtureError>;
