use super::counter;
use scoped_fixtures::testing::{run_until_fatal, MockTest};
use scoped_fixtures::{CacheScope, Environment, FixtureError, FixtureOptions, FixtureState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

type Gate = (mpsc::Sender<()>, mpsc::Receiver<()>);

/// Reports through the gate when it starts producing, then waits for it to
/// open.
fn slow_fixture(env: &Environment, calls: &AtomicUsize, gate: Option<Gate>) -> usize {
    env.cache("slow", FixtureOptions::default(), move || {
        if let Some((started, open)) = gate {
            started.send(()).map_err(FixtureError::new)?;
            open.recv().map_err(FixtureError::new)?;
        }
        Ok(calls.fetch_add(1, Ordering::SeqCst))
    })
}

#[test]
fn concurrent_callers_share_one_production() {
    const THREADS: usize = 32;

    let state = FixtureState::new();
    let t = MockTest::new("concurrent");
    let env = Environment::with_state(t.clone(), state);
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);

    let values: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    counter(&env, CacheScope::Test, &calls)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|&v| v == 0));
    assert!(t.fatals().is_empty());
}

#[test]
fn waiters_block_only_on_their_own_key() {
    let state = FixtureState::new();
    let t = MockTest::new("blocking");
    let env = Environment::with_state(t.clone(), Arc::clone(&state));
    let calls = AtomicUsize::new(0);
    let other_calls = AtomicUsize::new(0);
    let (started_tx, started_rx) = mpsc::channel();
    let (open_tx, open_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    thread::scope(|s| {
        let (env, calls) = (&env, &calls);
        let producer = s.spawn(move || slow_fixture(env, calls, Some((started_tx, open_rx))));
        started_rx.recv().unwrap();

        s.spawn(move || {
            done_tx.send(slow_fixture(env, calls, None)).unwrap();
        });

        // Another fixture is not held up.
        assert_eq!(counter(env, CacheScope::Test, &other_calls), 0);
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        open_tx.send(()).unwrap();
        assert_eq!(producer.join().unwrap(), 0);
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn abandoned_producer_unblocks_waiters() {
    let state = FixtureState::new();
    let t = MockTest::new("abandon");
    let env = Environment::with_state(t.clone(), Arc::clone(&state));
    let (started_tx, started_rx) = mpsc::channel();
    let (waited_tx, waited_rx) = mpsc::channel();

    let fixture = |env: &Environment, on_start: Option<mpsc::Sender<()>>| -> u8 {
        env.cache(&(), FixtureOptions::default(), move || {
            if let Some(tx) = on_start {
                tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                panic!("producer thread died");
            }
            Ok(1)
        })
    };

    thread::scope(|s| {
        let env = &env;
        let producer = s.spawn(move || fixture(env, Some(started_tx)));
        started_rx.recv().unwrap();

        s.spawn(move || {
            let result = run_until_fatal(|| fixture(env, None));
            waited_tx.send(result).unwrap();
        });

        assert!(producer.join().is_err());
        let waited = waited_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(waited, None);
    });

    assert!(t.fatals()[0].contains("exited without returning a result"));
}
