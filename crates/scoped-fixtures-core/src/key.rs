//! Opaque cache keys.

use std::fmt;
use std::sync::Arc;

/// Opaque identity of a memoized fixture.
///
/// Keys are immutable byte strings compared by equality. Cloning is a
/// reference-count bump, so keys can be recorded in several places (the
/// cache tables and the owning scope record) without copying.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<[u8]>);

impl CacheKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        CacheKey(Arc::from(bytes.as_ref()))
    }

    /// Returns the key's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::from_bytes(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::from_bytes(s)
    }
}

impl From<Vec<u8>> for CacheKey {
    fn from(bytes: Vec<u8>) -> Self {
        CacheKey(Arc::from(bytes))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({:?})", String::from_utf8_lossy(&self.0))
    }
}
