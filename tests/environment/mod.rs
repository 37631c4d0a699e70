use scoped_fixtures::{CacheScope, Env, FixtureOptions};
use std::sync::atomic::{AtomicUsize, Ordering};

mod concurrency;
mod custom_env;
mod lifecycle;

/// Returns the number of earlier `calls` the first time it runs in a scope.
pub fn counter(env: &impl Env, scope: CacheScope, calls: &AtomicUsize) -> usize {
    env.environment()
        .cache(&(), FixtureOptions::default().scope(scope), || {
            Ok(calls.fetch_add(1, Ordering::SeqCst))
        })
}

/// Like [`counter`], with a name that is part of the cache key.
pub fn named_counter(env: &impl Env, name: &str, calls: &AtomicUsize) -> usize {
    env.environment()
        .cache(name, FixtureOptions::default(), || {
            Ok(calls.fetch_add(1, Ordering::SeqCst))
        })
}
