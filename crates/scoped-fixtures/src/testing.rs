//! Test doubles for code built on top of fixture environments.

use crate::host::{Cleanup, SkipSignal, TestHandle};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Panic payload of [`MockTest::fail_now`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalSignal {
    pub message: String,
}

/// [`TestHandle`] that records what happens to it.
///
/// `fail_now` and `skip_now` record the call and unwind; wrap the code under
/// test in [`run_until_fatal`]. Cleanups only run on
/// [`call_cleanup`](Self::call_cleanup).
pub struct MockTest {
    name: String,
    fatals: Mutex<Vec<String>>,
    skips: AtomicUsize,
    cleanups: Mutex<Vec<Cleanup>>,
}

impl MockTest {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fatals: Mutex::new(Vec::new()),
            skips: AtomicUsize::new(0),
            cleanups: Mutex::new(Vec::new()),
        })
    }

    /// Messages passed to `fail_now`, oldest first.
    pub fn fatals(&self) -> Vec<String> {
        self.fatals.lock().clone()
    }

    pub fn skip_count(&self) -> usize {
        self.skips.load(Ordering::SeqCst)
    }

    /// Number of cleanups registered and not yet run.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.lock().len()
    }

    /// Runs registered cleanups, newest first.
    pub fn call_cleanup(&self) {
        loop {
            let next = self.cleanups.lock().pop();
            match next {
                Some(cleanup) => cleanup(),
                None => break,
            }
        }
    }
}

impl TestHandle for MockTest {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn cleanup(&self, f: Cleanup) {
        self.cleanups.lock().push(f);
    }

    fn fail_now(&self, message: &str) -> ! {
        self.fatals.lock().push(message.to_string());
        panic::panic_any(FatalSignal {
            message: message.to_string(),
        });
    }

    fn skip_now(&self) -> ! {
        self.skips.fetch_add(1, Ordering::SeqCst);
        panic::panic_any(SkipSignal {
            test: self.name.clone(),
        });
    }
}

impl std::fmt::Debug for MockTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTest")
            .field("name", &self.name)
            .field("fatals", &self.fatals.lock().len())
            .field("skips", &self.skip_count())
            .field("cleanups", &self.cleanup_count())
            .finish()
    }
}

/// Runs `f`, stopping at the first `fail_now` or `skip_now`.
///
/// Returns `None` if `f` was stopped that way. Any other panic propagates.
pub fn run_until_fatal<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => Some(r),
        Err(payload) if payload.is::<FatalSignal>() || payload.is::<SkipSignal>() => None,
        Err(payload) => panic::resume_unwind(payload),
    }
}
