//! Stock fixtures.
//!
//! Ready-made fixtures for resources most test suites need. Each takes any
//! [`Env`](crate::Env) and lives in the default [`CacheScope::Test`](crate::CacheScope::Test)
//! scope, so repeated calls within one test share the resource.

mod filesystem;
mod network;
mod signal;

pub use filesystem::{temp_dir, temp_file, temp_file_named};
pub use network::{
    free_local_tcp_address, free_local_tcp_address_named, local_tcp_listener,
    local_tcp_listener_named,
};
pub use signal::{shutdown_signal, ShutdownSignal};
