//! Cache scopes and the registry of live scope records.

use crate::error::ScopeError;
use crate::host::TestHandle;
use hashbrown::HashMap;
use parking_lot::Mutex;
use scoped_fixtures_core::CacheKey;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Scope name of the virtual whole-run test.
pub const MAIN_SCOPE_NAME: &str = "MainScope";

/// How long a fixture result lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Once per test. Subtests get their own value.
    #[default]
    Test,
    /// Once per top-level test, shared with all of its subtests.
    TestAndSubtests,
    /// Once per test run. Requires an active [`MainScope`](crate::MainScope).
    Package,
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheScope::Test => "test",
            CacheScope::TestAndSubtests => "test_and_subtests",
            CacheScope::Package => "package",
        })
    }
}

/// Resolves the scope name a fixture call belongs to.
///
/// ```rust
/// use scoped_fixtures::{scope_name, CacheScope, MAIN_SCOPE_NAME};
///
/// assert_eq!(scope_name("Outer/inner", CacheScope::Test), "Outer/inner");
/// assert_eq!(scope_name("Outer/inner", CacheScope::TestAndSubtests), "Outer");
/// assert_eq!(scope_name("Outer/inner", CacheScope::Package), MAIN_SCOPE_NAME);
/// ```
pub fn scope_name(test_name: &str, scope: CacheScope) -> String {
    match scope {
        CacheScope::Test => test_name.to_string(),
        CacheScope::TestAndSubtests => test_name
            .split_once('/')
            .map_or(test_name, |(top, _)| top)
            .to_string(),
        CacheScope::Package => MAIN_SCOPE_NAME.to_string(),
    }
}

/// Keys created within one scope, and the test that owns the scope.
pub struct ScopeRecord {
    owner: Arc<dyn TestHandle>,
    keys: Mutex<Vec<CacheKey>>,
}

impl ScopeRecord {
    fn new(owner: Arc<dyn TestHandle>) -> Self {
        Self {
            owner,
            keys: Mutex::new(Vec::new()),
        }
    }

    /// The test whose end closes this scope.
    pub fn owner(&self) -> &Arc<dyn TestHandle> {
        &self.owner
    }

    /// Appends a key. Duplicates are kept; deletion ignores them.
    pub fn add_key(&self, key: CacheKey) {
        self.keys.lock().push(key);
    }

    /// Snapshot of the recorded keys, in insertion order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.keys.lock().clone()
    }

    fn drain(&self) -> Vec<CacheKey> {
        std::mem::take(&mut *self.keys.lock())
    }
}

impl fmt::Debug for ScopeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRecord")
            .field("owner", &self.owner.name())
            .field("keys", &self.keys.lock().len())
            .finish()
    }
}

/// Live scope records by scope name.
#[derive(Default)]
pub struct ScopeRegistry {
    records: Mutex<HashMap<String, Arc<ScopeRecord>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record for `name`, owned by `owner`.
    pub fn register(
        &self,
        name: &str,
        owner: Arc<dyn TestHandle>,
    ) -> Result<Arc<ScopeRecord>, ScopeError> {
        let mut records = self.records.lock();
        if records.contains_key(name) {
            return Err(ScopeError::AlreadyRegistered(name.to_string()));
        }

        let record = Arc::new(ScopeRecord::new(owner));
        records.insert(name.to_string(), Arc::clone(&record));

        #[cfg(feature = "tracing")]
        info!(scope = name, "fixture scope registered");

        Ok(record)
    }

    /// Returns the record for `name`, if registered.
    pub fn record(&self, name: &str) -> Option<Arc<ScopeRecord>> {
        self.records.lock().get(name).cloned()
    }

    /// Appends `key` to the record of `name`.
    pub fn add_key(&self, name: &str, key: CacheKey) -> Result<(), ScopeError> {
        let record = self
            .record(name)
            .ok_or_else(|| ScopeError::NotRegistered(name.to_string()))?;
        record.add_key(key);
        Ok(())
    }

    /// Removes the record of `name` and returns its keys.
    pub fn take(&self, name: &str) -> Result<Vec<CacheKey>, ScopeError> {
        let record = self
            .records
            .lock()
            .remove(name)
            .ok_or_else(|| ScopeError::UnknownScope(name.to_string()))?;

        let keys = record.drain();

        #[cfg(feature = "tracing")]
        debug!(scope = name, keys = keys.len(), "fixture scope removed");

        Ok(keys)
    }

    /// Returns true if `name` has a live record.
    pub fn contains(&self, name: &str) -> bool {
        self.records.lock().contains_key(name)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.records.lock();
        f.debug_struct("ScopeRegistry")
            .field("scopes", &records.keys().collect::<Vec<_>>())
            .finish()
    }
}
