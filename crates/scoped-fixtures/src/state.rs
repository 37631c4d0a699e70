//! Shared fixture state: the cache plus the scope registry.

use crate::error::ScopeError;
use crate::scope::ScopeRegistry;
use scoped_fixtures_cache::{CacheConfig, KeyedCache};
use scoped_fixtures_core::{CacheKey, FixtureValue};
use std::sync::{Arc, OnceLock};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Cache and scope records shared by every environment of a test run.
///
/// Most code uses [`FixtureState::global`]. Tests of the fixture machinery
/// itself, or suites that want isolation, create their own state and pass it
/// to [`Environment::with_state`](crate::Environment::with_state).
#[derive(Debug)]
pub struct FixtureState {
    cache: KeyedCache<CacheKey, FixtureValue>,
    scopes: ScopeRegistry,
}

impl FixtureState {
    pub fn new() -> Arc<Self> {
        Self::with_cache(CacheConfig::builder().name("fixtures").build())
    }

    /// Creates a state around a configured cache.
    pub fn with_cache(cache: KeyedCache<CacheKey, FixtureValue>) -> Arc<Self> {
        Arc::new(Self {
            cache,
            scopes: ScopeRegistry::new(),
        })
    }

    /// The process-wide default state.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<FixtureState>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(FixtureState::new))
    }

    pub fn cache(&self) -> &KeyedCache<CacheKey, FixtureValue> {
        &self.cache
    }

    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Ends scope `name`: removes its record and deletes its keys from the
    /// cache. Returns the number of cache entries removed.
    pub fn teardown_scope(&self, name: &str) -> Result<usize, ScopeError> {
        let keys = self.scopes.take(name)?;
        let removed = self.cache.delete_keys(&keys);

        #[cfg(feature = "tracing")]
        debug!(scope = name, removed, "fixture scope torn down");

        Ok(removed)
    }
}
