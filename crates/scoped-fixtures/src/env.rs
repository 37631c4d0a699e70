//! Fixture environments.
//!
//! An [`Environment`] binds one running test to the shared [`FixtureState`].
//! Creating it registers the test's scope; the test's own cleanup mechanism
//! tears the scope down again when the test ends.

use crate::error::ScopeError;
use crate::host::{Cleanup, TestHandle};
use crate::key::{make_cache_key, make_override_key, CallSite};
use crate::scope::{scope_name, CacheScope};
use crate::state::FixtureState;
use scoped_fixtures_core::{CacheKey, FixtureError, FixtureValue};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Value produced by a fixture, plus what to run when its scope ends.
pub struct FixtureResult<T> {
    pub value: T,
    pub cleanup: Option<Cleanup>,
}

impl<T> FixtureResult<T> {
    /// A value without cleanup.
    pub fn new(value: T) -> Self {
        Self {
            value,
            cleanup: None,
        }
    }

    /// A value whose `cleanup` runs once, when the fixture's scope ends.
    pub fn with_cleanup<C>(value: T, cleanup: C) -> Self
    where
        C: FnOnce() + Send + 'static,
    {
        Self {
            value,
            cleanup: Some(Box::new(cleanup)),
        }
    }

    fn erase(self) -> FixtureResult<FixtureValue>
    where
        T: Send + Sync + 'static,
    {
        FixtureResult {
            value: Arc::new(self.value),
            cleanup: self.cleanup,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FixtureResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureResult")
            .field("value", &self.value)
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

/// Options of [`Environment::cache`] and [`Environment::cache_with_cleanup`].
#[derive(Debug, Clone, Default)]
pub struct FixtureOptions {
    scope: CacheScope,
    key: Option<CacheKey>,
}

impl FixtureOptions {
    /// Sets the scope the result lives in.
    ///
    /// Default: [`CacheScope::Test`]
    pub fn scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    /// Uses `key` in place of the params to identify the call. The fixture
    /// function, call site and scope still take part in the key.
    pub fn key(mut self, key: impl Into<CacheKey>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Options of [`Environment::cache_result`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    scope: CacheScope,
    params: Result<serde_json::Value, String>,
}

impl CacheOptions {
    /// Sets the scope the result lives in.
    ///
    /// Default: [`CacheScope::Test`]
    pub fn scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the params that tell calls from the same call site apart.
    ///
    /// Params that fail to serialize fail the test when the fixture is
    /// called.
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> Self {
        self.params = serde_json::to_value(params).map_err(|err| err.to_string());
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            scope: CacheScope::Test,
            params: Ok(serde_json::Value::Null),
        }
    }
}

/// Anything fixtures can be called with.
///
/// Implement it for a struct that wraps an [`Environment`] to give fixtures
/// access to extra per-test context.
pub trait Env {
    fn environment(&self) -> &Environment;

    /// The test the environment belongs to.
    fn t(&self) -> &Arc<dyn TestHandle> {
        self.environment().t()
    }
}

/// Fixture cache front end for one test.
pub struct Environment {
    t: Arc<dyn TestHandle>,
    state: Arc<FixtureState>,
}

impl Environment {
    /// Creates the environment of `t` on the process-wide state.
    pub fn new(t: Arc<dyn TestHandle>) -> Self {
        Self::with_state(t, FixtureState::global())
    }

    /// Creates the environment of `t` on `state`.
    ///
    /// Registers the scope named after `t` and installs its teardown as a
    /// cleanup of `t`. A second environment for a live scope fails `t`.
    pub fn with_state(t: Arc<dyn TestHandle>, state: Arc<FixtureState>) -> Self {
        let name = t.name();
        if let Err(err) = state.scopes().register(&name, Arc::clone(&t)) {
            t.fail_now(&err.to_string());
        }

        let hook_state = Arc::clone(&state);
        let owner = Arc::downgrade(&t);
        t.cleanup(Box::new(move || {
            if let Err(err) = hook_state.teardown_scope(&name) {
                match owner.upgrade() {
                    Some(t) => t.fail_now(&err.to_string()),
                    None => panic!("{err}"),
                }
            }
        }));

        Self { t, state }
    }

    /// The test this environment belongs to.
    pub fn t(&self) -> &Arc<dyn TestHandle> {
        &self.t
    }

    pub fn state(&self) -> &Arc<FixtureState> {
        &self.state
    }

    /// Ends this environment's scope now.
    ///
    /// The same teardown is installed as a cleanup of the test when the
    /// environment is created, so calling this by hand makes that cleanup
    /// fail with [`ScopeError::UnknownScope`]. It exists for hosts that
    /// never run cleanups.
    pub fn teardown(&self) -> usize {
        match self.state.teardown_scope(&self.t.name()) {
            Ok(removed) => removed,
            Err(err) => self.t.fail_now(&err.to_string()),
        }
    }

    /// Returns the value for `key`, running `produce` at most once per key.
    ///
    /// `key` is used as is. The call is recorded in the scope `scope`
    /// resolves to, and the cleanup of the producing call is registered
    /// with that scope's owner. A skip error skips the current test on every
    /// call; any other error fails it.
    #[track_caller]
    pub fn obtain<F>(&self, key: CacheKey, scope: CacheScope, produce: F) -> FixtureValue
    where
        F: FnOnce() -> Result<FixtureResult<FixtureValue>, FixtureError>,
    {
        let site = CallSite::capture::<F>();
        self.obtain_at(&site, key, scope, produce)
    }

    /// Caches the value of `produce` per call site, `params` and scope.
    ///
    /// ```rust
    /// use scoped_fixtures::{Environment, FixtureOptions, FixtureState, TestScope};
    ///
    /// fn port(env: &Environment) -> u16 {
    ///     env.cache(&(), FixtureOptions::default(), || Ok(8080))
    /// }
    ///
    /// TestScope::run("doc", |t| {
    ///     let env = Environment::with_state(t.clone(), FixtureState::new());
    ///     assert_eq!(port(&env), port(&env));
    /// });
    /// ```
    #[track_caller]
    pub fn cache<P, T, F>(&self, params: &P, options: FixtureOptions, produce: F) -> T
    where
        P: Serialize + ?Sized,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, FixtureError>,
    {
        let site = CallSite::capture::<F>();
        let key = self.derive_key(&site, options.scope, options.key.as_ref(), params);
        let value = self.obtain_at(&site, key, options.scope, || {
            produce().map(|value| FixtureResult::new(value).erase())
        });
        self.downcast(&site, value)
    }

    /// Like [`cache`](Self::cache), for producers that also return a
    /// cleanup. The cleanup runs once, when the scope ends.
    #[track_caller]
    pub fn cache_with_cleanup<P, T, C, F>(
        &self,
        params: &P,
        options: FixtureOptions,
        produce: F,
    ) -> T
    where
        P: Serialize + ?Sized,
        T: Clone + Send + Sync + 'static,
        C: FnOnce() + Send + 'static,
        F: FnOnce() -> Result<(T, C), FixtureError>,
    {
        let site = CallSite::capture::<F>();
        let key = self.derive_key(&site, options.scope, options.key.as_ref(), params);
        let value = self.obtain_at(&site, key, options.scope, || {
            produce().map(|(value, cleanup)| FixtureResult::with_cleanup(value, cleanup).erase())
        });
        self.downcast(&site, value)
    }

    /// Caches a [`FixtureResult`] producer.
    #[track_caller]
    pub fn cache_result<T, F>(&self, options: CacheOptions, produce: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<FixtureResult<T>, FixtureError>,
    {
        let site = CallSite::capture::<F>();
        let params = match options.params {
            Ok(params) => params,
            Err(err) => self.t.fail_now(&format!(
                "failed to create cache key: {}",
                crate::error::KeyError::Params(err)
            )),
        };
        let key = self.derive_key(&site, options.scope, None, &params);
        let value = self.obtain_at(&site, key, options.scope, || produce().map(FixtureResult::erase));
        self.downcast(&site, value)
    }

    /// Deletes cached results so the next call produces them again.
    ///
    /// Keys of a scope are listed by its [`ScopeRecord`](crate::ScopeRecord).
    /// Cleanups already registered for them still run at scope end.
    pub fn invalidate(&self, keys: &[CacheKey]) -> usize {
        self.state.cache().delete_keys(keys)
    }

    fn derive_key<P>(
        &self,
        site: &CallSite,
        scope: CacheScope,
        key: Option<&CacheKey>,
        params: &P,
    ) -> CacheKey
    where
        P: Serialize + ?Sized,
    {
        let name = scope_name(&self.t.name(), scope);
        let derived = match key {
            Some(key) => make_override_key(scope, &name, site, key),
            None => make_cache_key(scope, &name, site, params),
        };
        match derived {
            Ok(key) => key,
            Err(err) => self.t.fail_now(&format!("failed to create cache key: {err}")),
        }
    }

    fn obtain_at<F>(
        &self,
        site: &CallSite,
        key: CacheKey,
        scope: CacheScope,
        produce: F,
    ) -> FixtureValue
    where
        F: FnOnce() -> Result<FixtureResult<FixtureValue>, FixtureError>,
    {
        let name = scope_name(&self.t.name(), scope);
        let Some(record) = self.state.scopes().record(&name) else {
            self.t.fail_now(&ScopeError::NotRegistered(name).to_string());
        };

        // Recorded on every call, before anything can unwind.
        record.add_key(key.clone());

        let owner = Arc::clone(record.owner());
        let result = self.state.cache().fetch_or_populate(&key, move || {
            let FixtureResult { value, cleanup } = produce()?;
            if let Some(cleanup) = cleanup {
                owner.cleanup(cleanup);
            }
            Ok(value)
        });

        match result {
            Ok(value) => value,
            Err(FixtureError::Skip) => {
                #[cfg(feature = "tracing")]
                debug!(fixture = %site, test = %self.t.name(), "fixture skipped the test");
                self.t.skip_now()
            }
            Err(err) => self
                .t
                .fail_now(&format!("failed to call fixture func \"{site}\": {err}")),
        }
    }

    fn downcast<T>(&self, site: &CallSite, value: FixtureValue) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        match value.downcast::<T>() {
            Ok(value) => T::clone(&value),
            Err(_) => self.t.fail_now(&format!(
                "fixture \"{site}\" cached a value that is not a {}",
                std::any::type_name::<T>()
            )),
        }
    }
}

impl Env for Environment {
    fn environment(&self) -> &Environment {
        self
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("test", &self.t.name())
            .finish()
    }
}
