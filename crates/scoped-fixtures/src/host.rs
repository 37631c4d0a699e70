//! Host test handles.
//!
//! The fixture machinery never talks to a test framework directly. It only
//! needs the four operations of [`TestHandle`]: a name, a place to register
//! end-of-scope cleanups, and two ways to stop the current test.

use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback run when a scope ends.
pub type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Contract between fixture environments and the running test.
pub trait TestHandle: Send + Sync {
    /// Full path of the test, subtests separated by `/`.
    fn name(&self) -> String;

    /// Registers `f` to run when the test ends. Cleanups run in reverse
    /// registration order.
    fn cleanup(&self, f: Cleanup);

    /// Fails the test with `message` and stops the current thread of
    /// execution.
    fn fail_now(&self, message: &str) -> !;

    /// Marks the test skipped and stops the current thread of execution.
    fn skip_now(&self) -> !;
}

/// Panic payload used by [`TestScope`] to unwind out of a skipped test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSignal {
    /// Name of the skipped test.
    pub test: String,
}

/// How a [`TestScope::run`] body finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The body returned normally.
    Passed(R),
    /// The body called `skip_now`.
    Skipped,
}

impl<R> Outcome<R> {
    /// Returns true if the test was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    /// Returns the body's value if the test passed.
    pub fn passed(self) -> Option<R> {
        match self {
            Outcome::Passed(r) => Some(r),
            Outcome::Skipped => None,
        }
    }
}

/// [`TestHandle`] for plain `#[test]` functions.
///
/// The standard harness has no cleanup hooks or subtests, so `TestScope`
/// provides them: [`run`](Self::run) executes a body, then runs the
/// registered cleanups in reverse order whether the body returned, failed or
/// skipped.
///
/// ```rust
/// use scoped_fixtures::{Outcome, TestHandle, TestScope};
///
/// let outcome = TestScope::run("parent", |t| {
///     t.subtest("child", |sub| sub.name())
/// });
/// assert_eq!(outcome, Outcome::Passed(Outcome::Passed("parent/child".to_string())));
/// ```
pub struct TestScope {
    name: String,
    cleanups: Mutex<Vec<Cleanup>>,
    skipped: AtomicBool,
}

impl TestScope {
    /// Creates a scope with the given test path.
    ///
    /// The caller is responsible for calling [`finish`](Self::finish);
    /// prefer [`run`](Self::run).
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            cleanups: Mutex::new(Vec::new()),
            skipped: AtomicBool::new(false),
        })
    }

    /// Runs `f` as a test named `name`.
    ///
    /// Cleanups run after `f`, in reverse registration order. A skip unwinds
    /// into [`Outcome::Skipped`]; any other panic is resumed once cleanups
    /// have run.
    pub fn run<F, R>(name: impl Into<String>, f: F) -> Outcome<R>
    where
        F: FnOnce(&Arc<TestScope>) -> R,
    {
        let scope = Self::new(name);
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        scope.finish();

        match result {
            Ok(r) => Outcome::Passed(r),
            Err(payload) if payload.is::<SkipSignal>() => Outcome::Skipped,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Runs `f` as a test named after the current libtest thread.
    pub fn current<F, R>(f: F) -> Outcome<R>
    where
        F: FnOnce(&Arc<TestScope>) -> R,
    {
        let name = std::thread::current()
            .name()
            .unwrap_or("main")
            .to_string();
        Self::run(name, f)
    }

    /// Runs `f` as a subtest `<this name>/<name>`.
    pub fn subtest<F, R>(&self, name: &str, f: F) -> Outcome<R>
    where
        F: FnOnce(&Arc<TestScope>) -> R,
    {
        Self::run(format!("{}/{}", self.name, name), f)
    }

    /// Runs and drains the registered cleanups, newest first.
    ///
    /// Every cleanup runs even if an earlier one panics; the first panic is
    /// resumed afterwards.
    pub fn finish(&self) {
        let mut first_panic: Option<Box<dyn Any + Send>> = None;

        loop {
            // Cleanups may register further cleanups, so pop one at a time.
            let next = self.cleanups.lock().pop();
            let Some(cleanup) = next else { break };

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                first_panic.get_or_insert(payload);
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    /// Returns true if `skip_now` was called.
    pub fn is_skipped(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }
}

impl TestHandle for TestScope {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn cleanup(&self, f: Cleanup) {
        self.cleanups.lock().push(f);
    }

    fn fail_now(&self, message: &str) -> ! {
        panic!("{}: {}", self.name, message);
    }

    fn skip_now(&self) -> ! {
        self.skipped.store(true, Ordering::SeqCst);
        panic::panic_any(SkipSignal {
            test: self.name.clone(),
        });
    }
}

impl std::fmt::Debug for TestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestScope")
            .field("name", &self.name)
            .field("cleanups", &self.cleanups.lock().len())
            .field("skipped", &self.is_skipped())
            .finish()
    }
}
