//! The whole-run scope.
//!
//! [`CacheScope::Package`](crate::CacheScope::Package) fixtures live in a
//! scope owned by a virtual test that exists for the whole run. Enter it
//! once before the first such fixture is used and exit it after the last.

use crate::env::Environment;
use crate::host::{Cleanup, SkipSignal, TestHandle};
use crate::scope::MAIN_SCOPE_NAME;
use crate::state::FixtureState;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

type FailHook = Arc<dyn Fn(&str) + Send + Sync>;
type SkipHook = Arc<dyn Fn() + Send + Sync>;

/// Configuration of a [`MainScope`].
#[derive(Clone, Default)]
pub struct MainScopeConfig {
    state: Option<Arc<FixtureState>>,
    on_fail: Option<FailHook>,
    on_skip: Option<SkipHook>,
}

impl MainScopeConfig {
    pub fn builder() -> MainScopeConfigBuilder {
        MainScopeConfigBuilder::new()
    }
}

impl fmt::Debug for MainScopeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainScopeConfig")
            .field("custom_state", &self.state.is_some())
            .field("on_fail", &self.on_fail.is_some())
            .field("on_skip", &self.on_skip.is_some())
            .finish()
    }
}

/// Builder for [`MainScopeConfig`].
#[derive(Default)]
pub struct MainScopeConfigBuilder {
    config: MainScopeConfig,
}

impl MainScopeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `state` instead of [`FixtureState::global`].
    pub fn state(mut self, state: Arc<FixtureState>) -> Self {
        self.config.state = Some(state);
        self
    }

    /// Called with the message when the whole-run scope fails, before the
    /// failure unwinds.
    pub fn on_fail<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.config.on_fail = Some(Arc::new(f));
        self
    }

    /// Called when a fixture skips the whole-run scope, before the skip
    /// unwinds.
    pub fn on_skip<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_skip = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> MainScopeConfig {
        self.config
    }
}

/// Test handle of the whole-run scope.
struct VirtualTest {
    cleanups: Mutex<Vec<Cleanup>>,
    skipped: AtomicBool,
    on_fail: Option<FailHook>,
    on_skip: Option<SkipHook>,
}

impl VirtualTest {
    fn run_cleanups(&self) {
        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        loop {
            let next = self.cleanups.lock().pop();
            let Some(cleanup) = next else { break };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                first_panic.get_or_insert(payload);
            }
        }

        if let Some(payload) = first_panic {
            #[cfg(feature = "tracing")]
            warn!(scope = MAIN_SCOPE_NAME, "whole-run cleanup panicked");

            if !std::thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl TestHandle for VirtualTest {
    fn name(&self) -> String {
        MAIN_SCOPE_NAME.to_string()
    }

    fn cleanup(&self, f: Cleanup) {
        self.cleanups.lock().push(f);
    }

    fn fail_now(&self, message: &str) -> ! {
        if let Some(hook) = &self.on_fail {
            hook(message);
        }
        panic!("{MAIN_SCOPE_NAME}: {message}");
    }

    fn skip_now(&self) -> ! {
        self.skipped.store(true, Ordering::SeqCst);
        if let Some(hook) = &self.on_skip {
            hook();
        }
        panic::panic_any(SkipSignal {
            test: MAIN_SCOPE_NAME.to_string(),
        });
    }
}

/// Guard of the whole-run scope.
///
/// Dropping it (or calling [`exit`](Self::exit)) runs the cleanups of every
/// package fixture, newest first, and purges them from the cache.
///
/// ```rust
/// use scoped_fixtures::{
///     CacheScope, Environment, FixtureOptions, FixtureState, MainScope, MainScopeConfig,
///     TestScope,
/// };
///
/// let state = FixtureState::new();
/// let main = MainScope::enter(MainScopeConfig::builder().state(state.clone()).build());
///
/// let shared = |env: &Environment| -> u32 {
///     env.cache(&(), FixtureOptions::default().scope(CacheScope::Package), || Ok(42))
/// };
/// TestScope::run("a", |t| shared(&Environment::with_state(t.clone(), state.clone())));
/// assert_eq!(state.cache().len(), 1);
///
/// main.exit();
/// assert!(state.cache().is_empty());
/// ```
pub struct MainScope {
    test: Arc<VirtualTest>,
    env: Environment,
}

impl MainScope {
    /// Registers the whole-run scope.
    ///
    /// Entering it twice on the same state fails through the configured
    /// fail hook.
    pub fn enter(config: MainScopeConfig) -> Self {
        let state = config.state.unwrap_or_else(FixtureState::global);
        let test = Arc::new(VirtualTest {
            cleanups: Mutex::new(Vec::new()),
            skipped: AtomicBool::new(false),
            on_fail: config.on_fail,
            on_skip: config.on_skip,
        });

        let handle: Arc<dyn TestHandle> = test.clone();
        let env = Environment::with_state(handle, state);

        #[cfg(feature = "tracing")]
        info!(scope = MAIN_SCOPE_NAME, "whole-run scope entered");

        Self { test, env }
    }

    /// Environment of the whole-run scope.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Returns true if a fixture skipped the whole-run scope.
    pub fn is_skipped(&self) -> bool {
        self.test.skipped.load(Ordering::SeqCst)
    }

    /// Ends the whole-run scope.
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for MainScope {
    fn drop(&mut self) {
        self.test.run_cleanups();

        #[cfg(feature = "tracing")]
        info!(scope = MAIN_SCOPE_NAME, "whole-run scope exited");
    }
}

impl fmt::Debug for MainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainScope")
            .field("cleanups", &self.test.cleanups.lock().len())
            .field("skipped", &self.is_skipped())
            .finish()
    }
}

/// Runs `f` inside a whole-run scope and exits it afterwards, also when `f`
/// panics.
pub fn run_with_main_scope<F, R>(config: MainScopeConfig, f: F) -> R
where
    F: FnOnce(&Environment) -> R,
{
    let scope = MainScope::enter(config);
    let result = f(scope.env());
    scope.exit();
    result
}
