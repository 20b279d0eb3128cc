//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, middleware, request IDs)
//!     → /proxy/*  → proxy::ProxyService (credential injection, cache)
//!     → /static/* and pretty URLs → site (assets, meta injection)
//! ```

pub mod server;

pub use server::HttpServer;
