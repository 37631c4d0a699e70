//! Observer hooks for fixture caches.
//!
//! A cache reports what it does (hits, misses, productions, abandoned
//! producers, purges) to a list of closures. Observers never influence the
//! cache: a listener that panics is contained and logged.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// An event reported by a fixture cache.
pub trait FixtureEvent: Send + Sync + fmt::Debug {
    /// Stable identifier such as `"cache_hit"` or `"cache_purged"`.
    fn event_type(&self) -> &'static str;

    /// Name of the cache that reported the event.
    fn cache_name(&self) -> &str;
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Closures notified of every event of type `E`, in registration order.
pub struct EventListeners<E> {
    listeners: Vec<Listener<E>>,
}

impl<E: FixtureEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers `f` for every event.
    pub fn add<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(f));
    }

    /// Notifies every listener of `event`.
    ///
    /// Emission happens while the cache may hold a key's execution lock, so
    /// a listener panic must not unwind into the caller. Returns how many
    /// listeners panicked.
    pub fn emit(&self, event: &E) -> usize {
        let mut panicked = 0;
        for listener in &self.listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                panicked += 1;

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    cache = event.cache_name(),
                    event = event.event_type(),
                    "fixture event listener panicked"
                );
            }
        }
        panicked
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: FixtureEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
