//! Lifecycle management.
//!
//! Startup is ordered in `main` (config, metrics, listener, server);
//! shutdown is coordinated through a broadcast channel so the server and
//! any background tasks stop together.

pub mod shutdown;

pub use shutdown::Shutdown;
