//! Cache key derivation.
//!
//! A fixture call is identified by the fixture function that made it and
//! the source line of the call. Both come from the compiler: the function
//! through [`std::any::type_name`] of the producer closure, which names the
//! enclosing function, and the line through `#[track_caller]`.

use crate::error::KeyError;
use crate::scope::CacheScope;
use scoped_fixtures_core::CacheKey;
use serde::Serialize;
use std::fmt;
use std::panic::Location;

/// Identity of the fixture function that requested a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    function: &'static str,
    location: &'static Location<'static>,
}

impl CallSite {
    /// Captures the caller's location and the item path of `F`.
    ///
    /// `F` is normally the producer closure, whose type name is the path of
    /// the fixture function followed by `::{{closure}}`.
    #[track_caller]
    pub fn capture<F: ?Sized>() -> Self {
        Self {
            function: std::any::type_name::<F>(),
            location: Location::caller(),
        }
    }

    pub fn new(function: &'static str, location: &'static Location<'static>) -> Self {
        Self { function, location }
    }

    /// Path of the fixture function, without closure suffixes.
    pub fn function(&self) -> &'static str {
        let mut name = self.function;
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{})",
            self.function(),
            self.location.file(),
            self.location.line()
        )
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("function", &self.function)
            .field("file", &self.location.file())
            .field("line", &self.location.line())
            .finish()
    }
}

#[derive(Serialize)]
struct KeyParts<'a, T: Serialize> {
    scope: CacheScope,
    scope_name: &'a str,
    func: &'a str,
    file: &'a str,
    line: u32,
    params: T,
}

/// Derives the cache key of a fixture call.
///
/// Params go through [`serde_json::Value`] first so map entries are sorted
/// and equal params always give equal keys.
pub fn make_cache_key<P>(
    scope: CacheScope,
    scope_name: &str,
    site: &CallSite,
    params: &P,
) -> Result<CacheKey, KeyError>
where
    P: Serialize + ?Sized,
{
    if site.function().is_empty() || site.location.file().is_empty() {
        return Err(KeyError::UnknownCaller);
    }

    let parts = KeyParts {
        scope,
        scope_name,
        func: site.function(),
        file: site.location.file(),
        line: site.location.line(),
        params: serde_json::to_value(params)?,
    };

    Ok(CacheKey::from(serde_json::to_vec(&parts)?))
}

/// Derives the key of a call made with an explicit key override.
///
/// The override takes the place of the params; the fixture function and
/// call site still count, so two fixtures sharing an override string get
/// separate entries.
pub fn make_override_key(
    scope: CacheScope,
    scope_name: &str,
    site: &CallSite,
    key: &CacheKey,
) -> Result<CacheKey, KeyError> {
    #[derive(Serialize)]
    struct Override<'a> {
        key: &'a [u8],
    }

    make_cache_key(scope, scope_name, site, &Override { key: key.as_bytes() })
}
