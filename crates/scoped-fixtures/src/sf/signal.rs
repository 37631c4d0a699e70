use crate::env::{CacheOptions, Env, FixtureResult};
use tokio::sync::watch;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Fires when the test that created it ends.
///
/// Hand it to background tasks started by a test so they stop with it.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // A closed channel also means the scope is gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// The shutdown signal of the current test.
pub fn shutdown_signal(env: &dyn Env) -> ShutdownSignal {
    env.environment()
        .cache_result(CacheOptions::default(), || {
            let (tx, rx) = watch::channel(false);
            Ok(FixtureResult::with_cleanup(ShutdownSignal { rx }, move || {
                #[cfg(feature = "tracing")]
                debug!("shutdown signal fired");

                let _ = tx.send(true);
            }))
        })
}
