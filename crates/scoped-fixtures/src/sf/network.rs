use crate::env::{CacheOptions, Env, FixtureResult};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

const LOCALHOST: &str = "127.0.0.1:0";

/// A TCP listener bound to a free local port.
pub fn local_tcp_listener(env: &dyn Env) -> Arc<TcpListener> {
    local_tcp_listener_named(env, "")
}

/// Like [`local_tcp_listener`]; each `name` gets its own listener.
///
/// The socket closes once the test ends and every returned handle is
/// dropped.
pub fn local_tcp_listener_named(env: &dyn Env, name: &str) -> Arc<TcpListener> {
    env.environment()
        .cache_result(CacheOptions::default().params(name), || {
            let listener = TcpListener::bind(LOCALHOST)?;

            #[cfg(feature = "tracing")]
            debug!(addr = ?listener.local_addr().ok(), name, "tcp listener bound");

            Ok(FixtureResult::new(Arc::new(listener)))
        })
}

/// A local address nothing listens on right now.
pub fn free_local_tcp_address(env: &dyn Env) -> SocketAddr {
    free_local_tcp_address_named(env, "")
}

/// Like [`free_local_tcp_address`]; each `name` gets its own address.
pub fn free_local_tcp_address_named(env: &dyn Env, name: &str) -> SocketAddr {
    env.environment()
        .cache_result(CacheOptions::default().params(name), || {
            let addr = TcpListener::bind(LOCALHOST)?.local_addr()?;
            Ok(FixtureResult::new(addr))
        })
}
