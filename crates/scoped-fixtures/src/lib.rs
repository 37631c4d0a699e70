//! Scoped, concurrency-safe fixtures for Rust tests.
//!
//! A fixture is a function that sets something up for a test (a temp
//! directory, a server, a random seed) and hands back a value. Wrapping its
//! body in one of the [`Environment`] cache calls makes it run at most once
//! per scope, however many times and from however many threads it is
//! called, and runs its cleanup exactly once when the scope ends.
//!
//! # Scopes
//!
//! - [`CacheScope::Test`]: once per test; subtests get their own value
//! - [`CacheScope::TestAndSubtests`]: once per top-level test, shared with
//!   its subtests
//! - [`CacheScope::Package`]: once per run; needs an active [`MainScope`]
//!
//! # Example
//!
//! ```rust
//! use scoped_fixtures::{Env, Environment, FixtureOptions, FixtureState, TestScope};
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! static CONNECTS: AtomicU32 = AtomicU32::new(0);
//!
//! fn database_url(env: &impl Env) -> String {
//!     env.environment().cache(&(), FixtureOptions::default(), || {
//!         CONNECTS.fetch_add(1, Ordering::SeqCst);
//!         Ok("postgres://localhost/test".to_string())
//!     })
//! }
//!
//! TestScope::run("uses_db", |t| {
//!     let env = Environment::with_state(t.clone(), FixtureState::new());
//!     assert_eq!(database_url(&env), database_url(&env));
//! });
//! assert_eq!(CONNECTS.load(Ordering::SeqCst), 1);
//! ```
//!
//! # Feature Flags
//!
//! - `tracing`: logs cache traffic and scope lifecycle with `tracing`
//! - `metrics`: records cache metrics with `metrics`

mod env;
mod error;
mod host;
mod key;
mod main_scope;
mod scope;
mod state;

pub mod sf;
pub mod testing;

pub use env::{CacheOptions, Env, Environment, FixtureOptions, FixtureResult};
pub use error::{KeyError, ScopeError};
pub use host::{Cleanup, Outcome, SkipSignal, TestHandle, TestScope};
pub use key::{make_cache_key, make_override_key, CallSite};
pub use main_scope::{run_with_main_scope, MainScope, MainScopeConfig, MainScopeConfigBuilder};
pub use scope::{scope_name, CacheScope, ScopeRecord, ScopeRegistry, MAIN_SCOPE_NAME};
pub use state::FixtureState;

pub use scoped_fixtures_cache::{CacheConfig, CacheConfigBuilder, CacheEvent, KeyedCache};
pub use scoped_fixtures_core::{CacheKey, CachedResult, FixtureError, FixtureValue};
