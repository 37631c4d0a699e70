//! Environment stress tests

use scoped_fixtures::{
    CacheScope, Environment, FixtureOptions, FixtureState, TestHandle, TestScope,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn shared(env: &Environment, calls: &AtomicUsize, id: usize) -> usize {
    env.cache(&id, FixtureOptions::default().scope(CacheScope::TestAndSubtests), || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(id * 2)
    })
}

/// Test: Thousands of subtests sharing parent fixtures from many threads
#[test]
#[ignore]
fn stress_subtests_share_parent_fixtures() {
    let state = FixtureState::new();
    let calls = AtomicUsize::new(0);

    TestScope::run("Parent", |t| {
        let _env = Environment::with_state(t.clone(), Arc::clone(&state));

        thread::scope(|s| {
            for worker in 0..16 {
                let (t, state, calls) = (t, &state, &calls);
                s.spawn(move || {
                    for i in 0..250 {
                        t.subtest(&format!("w{worker}-{i}"), |sub| {
                            let handle: Arc<dyn TestHandle> = sub.clone();
                            let env = Environment::with_state(handle, Arc::clone(state));
                            assert_eq!(shared(&env, calls, i % 50), (i % 50) * 2);
                        });
                    }
                });
            }
        });

        assert_eq!(state.cache().len(), 50);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 50);
    assert!(state.cache().is_empty());
    assert!(state.scopes().is_empty());
}

/// Test: Many short tests each creating and tearing down a scope
#[test]
#[ignore]
fn stress_scope_churn() {
    let state = FixtureState::new();
    let calls = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..8 {
            let (state, calls) = (&state, &calls);
            s.spawn(move || {
                for i in 0..2_000 {
                    TestScope::run(format!("Churn{worker}-{i}"), |t| {
                        let env = Environment::with_state(t.clone(), Arc::clone(state));
                        for id in 0..4 {
                            shared(&env, calls, id);
                        }
                    });
                }
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 8 * 2_000 * 4);
    assert!(state.cache().is_empty());
    assert!(state.scopes().is_empty());
}
