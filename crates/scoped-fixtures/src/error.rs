//! Error types for scope lifecycle and key derivation.

use thiserror::Error;

/// Lifecycle violations in the surrounding test code.
///
/// These are never cached: there is no valid scope or key to cache them
/// against. Environments surface them through `fail_now`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// An environment already exists for the scope.
    #[error("environment already registered for scope {0:?}")]
    AlreadyRegistered(String),

    /// A fixture resolved to a scope nobody registered.
    #[error(
        "unexpected scope {0:?}: initialize the main scope before using package fixtures \
         (see MainScope::enter or run_with_main_scope)"
    )]
    NotRegistered(String),

    /// Teardown was requested for a scope that is not registered.
    #[error("teardown requested for unknown scope {0:?}")]
    UnknownScope(String),
}

/// Failure to derive a cache key for a fixture call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The calling fixture could not be identified.
    #[error("failed to detect caller fixture function")]
    UnknownCaller,

    /// The fixture parameters could not be serialized.
    #[error("failed to serialize fixture params to json: {0}")]
    Params(String),
}

impl From<serde_json::Error> for KeyError {
    fn from(err: serde_json::Error) -> Self {
        KeyError::Params(err.to_string())
    }
}
