use super::counter;
use scoped_fixtures::testing::{run_until_fatal, MockTest};
use scoped_fixtures::{
    CacheOptions, CacheScope, Environment, FixtureError, FixtureOptions, FixtureResult,
    FixtureState, TestHandle, TestScope,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn failing_fixture(env: &Environment, calls: &AtomicUsize) -> u32 {
    env.cache(&(), FixtureOptions::default(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(FixtureError::msg("database is down"))
    })
}

#[test]
fn teardown_purges_exactly_its_scope() {
    let state = FixtureState::new();
    let calls = AtomicUsize::new(0);

    TestScope::run("Outer", |t| {
        let env = Environment::with_state(t.clone(), Arc::clone(&state));
        counter(&env, CacheScope::Test, &calls);
        let _: String = env.cache("second", FixtureOptions::default(), || Ok("b".to_string()));
        assert_eq!(state.cache().len(), 2);

        t.subtest("inner", |sub| {
            let env = Environment::with_state(sub.clone(), Arc::clone(&state));
            counter(&env, CacheScope::Test, &calls);
            assert_eq!(state.cache().len(), 3);
        });

        assert_eq!(state.cache().len(), 2);
        assert!(!state.scopes().contains("Outer/inner"));
    });

    assert_eq!(state.cache().len(), 0);
    assert!(state.scopes().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn cleanup_runs_once_per_scope() {
    let state = FixtureState::new();
    let cleaned = Arc::new(AtomicUsize::new(0));

    for (finished, test) in ["first", "second"].into_iter().enumerate() {
        TestScope::run(test, |t| {
            let env = Environment::with_state(t.clone(), Arc::clone(&state));
            for _ in 0..5 {
                let cleaned = Arc::clone(&cleaned);
                let _: u8 = env.cache_result(CacheOptions::default(), move || {
                    Ok(FixtureResult::with_cleanup(1, move || {
                        cleaned.fetch_add(1, Ordering::SeqCst);
                    }))
                });
            }
            // Only scopes that already ended have cleaned up.
            assert_eq!(cleaned.load(Ordering::SeqCst), finished);
        });
    }

    assert_eq!(cleaned.load(Ordering::SeqCst), 2);
}

#[test]
fn cleanups_run_in_reverse_order_before_purge() {
    let state = FixtureState::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    TestScope::run("ordered", |t| {
        let env = Environment::with_state(t.clone(), Arc::clone(&state));
        for name in ["db", "server", "client"] {
            let order = Arc::clone(&order);
            let state = Arc::clone(&state);
            let _: &str = env.cache_with_cleanup(name, FixtureOptions::default(), move || {
                Ok((name, move || {
                    // Values are still cached while cleanups run.
                    assert_eq!(state.cache().len(), 3);
                    order.lock().unwrap().push(name);
                }))
            });
        }
    });

    assert_eq!(*order.lock().unwrap(), vec!["client", "server", "db"]);
    assert!(state.cache().is_empty());
}

#[test]
fn failure_is_cached_and_names_the_fixture() {
    let state = FixtureState::new();
    let t = MockTest::new("fails");
    let env = Environment::with_state(t.clone(), state);
    let calls = AtomicUsize::new(0);

    assert!(run_until_fatal(|| failing_fixture(&env, &calls)).is_none());
    assert!(run_until_fatal(|| failing_fixture(&env, &calls)).is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let fatals = t.fatals();
    assert_eq!(fatals.len(), 2);
    assert_eq!(fatals[0], fatals[1]);
    assert!(fatals[0].starts_with("failed to call fixture func \""), "{}", fatals[0]);
    assert!(fatals[0].contains("failing_fixture"), "{}", fatals[0]);
    assert!(fatals[0].contains("lifecycle.rs:"), "{}", fatals[0]);
    assert!(fatals[0].ends_with("database is down"), "{}", fatals[0]);
}

#[test]
fn abandoned_producer_fails_later_callers() {
    let state = FixtureState::new();
    let t = MockTest::new("abandoned");
    let env = Environment::with_state(t.clone(), state);

    let fixture = |env: &Environment| -> u8 {
        env.cache(&(), FixtureOptions::default(), || -> Result<u8, FixtureError> {
            panic!("assertion failed inside fixture")
        })
    };

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fixture(&env)));
    assert!(unwound.is_err());
    assert!(t.fatals().is_empty());

    assert!(run_until_fatal(|| fixture(&env)).is_none());
    assert!(t.fatals()[0].contains("exited without returning a result"));
}

#[test]
fn second_environment_for_live_scope_fails() {
    let state = FixtureState::new();
    let t = MockTest::new("dup");
    let _env = Environment::with_state(t.clone(), Arc::clone(&state));

    assert!(run_until_fatal(|| Environment::with_state(t.clone(), Arc::clone(&state))).is_none());
    assert!(t.fatals()[0].contains("already registered"));

    // Once the scope is gone a new environment is fine.
    t.call_cleanup();
    let _again = Environment::with_state(t.clone(), state);
    assert_eq!(t.fatals().len(), 1);
}

#[test]
fn manual_teardown_then_hook_reports_unknown_scope() {
    let state = FixtureState::new();
    let t = MockTest::new("manual");
    let env = Environment::with_state(t.clone(), Arc::clone(&state));
    let calls = AtomicUsize::new(0);
    counter(&env, CacheScope::Test, &calls);

    assert_eq!(env.teardown(), 1);
    assert!(state.cache().is_empty());

    assert!(run_until_fatal(|| t.call_cleanup()).is_none());
    assert!(t.fatals()[0].contains("unknown scope \"manual\""));
}

#[test]
fn mock_name_is_scope_name() {
    let t = MockTest::new("Named/sub");
    assert_eq!(t.name(), "Named/sub");
}
