use crate::env::{CacheOptions, Env, FixtureResult};
use scoped_fixtures_core::FixtureError;
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

const PREFIX: &str = "scoped-fixtures-";

/// Path of a fresh temporary directory.
///
/// The directory and everything in it are removed when the test ends.
pub fn temp_dir(env: &dyn Env) -> PathBuf {
    env.environment()
        .cache_result(CacheOptions::default(), || {
            let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
            let path = dir.path().to_path_buf();

            #[cfg(feature = "tracing")]
            debug!(path = %path.display(), "temp dir created");

            Ok(FixtureResult::with_cleanup(path, move || {
                #[cfg(feature = "tracing")]
                let removed = dir.path().to_path_buf();

                match dir.close() {
                    #[cfg(feature = "tracing")]
                    Ok(()) => debug!(path = %removed.display(), "temp dir removed"),
                    #[cfg(feature = "tracing")]
                    Err(err) => {
                        warn!(path = %removed.display(), error = %err, "failed to remove temp dir")
                    }
                    #[cfg(not(feature = "tracing"))]
                    _ => {}
                }
            }))
        })
}

/// Path of an empty file inside [`temp_dir`].
pub fn temp_file(env: &dyn Env) -> PathBuf {
    temp_file_named(env, PREFIX)
}

/// Path of an empty file inside [`temp_dir`] whose name starts with
/// `prefix`. Each prefix gets its own file.
pub fn temp_file_named(env: &dyn Env, prefix: &str) -> PathBuf {
    env.environment()
        .cache_result(CacheOptions::default().params(prefix), || {
            let dir = temp_dir(env);
            let file = tempfile::Builder::new().prefix(prefix).tempfile_in(&dir)?;
            // Removed together with the directory.
            let (_, path) = file
                .keep()
                .map_err(|err| FixtureError::from(err.error))?;

            #[cfg(feature = "tracing")]
            debug!(path = %path.display(), "temp file created");

            Ok(FixtureResult::new(path))
        })
}
