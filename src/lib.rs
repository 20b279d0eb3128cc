//! Edge server for a third-party product catalogue API.
//!
//! Serves the static site, injects client-visible configuration into
//! outgoing HTML, and forwards `/proxy/*` requests to the upstream
//! catalogue API with injected credentials, per-tenant key resolution,
//! and response caching.

pub mod cache;
pub mod catalogue;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod security;
pub mod site;

pub use config::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
