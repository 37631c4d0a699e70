//! Error types shared by the fixture cache and environments.
//!
//! A [`FixtureError`] is committed into the cache as the terminal result of a
//! key, so it must be cheap to clone: every later caller of the same key gets
//! a copy of the very same error.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Terminal error of a fixture producer.
#[derive(Debug, Clone, Error)]
pub enum FixtureError {
    /// The fixture asked for the current test to be skipped.
    ///
    /// Cached like any other error, but surfaced through `skip_now` on every
    /// retrieval instead of failing the test.
    #[error("fixture requested to skip the test")]
    Skip,

    /// The producer unwound without returning a result.
    #[error("fixture producer exited without returning a result")]
    Abandoned,

    /// The producer returned an ordinary error.
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl FixtureError {
    /// Wraps an arbitrary error as a producer failure.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FixtureError::Failed(Arc::new(err))
    }

    /// Creates a producer failure from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        FixtureError::new(Message(message.to_string()))
    }

    /// Returns true if this is the skip sentinel.
    pub fn is_skip(&self) -> bool {
        matches!(self, FixtureError::Skip)
    }

    /// Returns true if the producer was abandoned mid-flight.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, FixtureError::Abandoned)
    }
}

impl From<std::io::Error> for FixtureError {
    fn from(err: std::io::Error) -> Self {
        FixtureError::new(err)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);
