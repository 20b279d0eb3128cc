//! Credential-injecting forwarding proxy.
//!
//! # Data Flow
//! ```text
//! inbound /proxy/* request
//!     → credentials.rs (resolve key + tenant, fixed precedence)
//!     → service.rs (build upstream URL, fail-fast, cache lookup)
//!     → forward.rs (issue request, follow bounded redirects)
//!     → service.rs (map product payloads, cache write, relay)
//! ```
//!
//! # Design Decisions
//! - One `ProxyService` instance owns the cache, tenant map, and client;
//!   shared via `Arc` instead of ambient globals
//! - Every internal error is recovered at the `forward` boundary into a
//!   well-formed JSON error response

pub mod credentials;
pub mod error;
pub mod forward;
pub mod probe;
pub mod service;

pub use credentials::{CredentialSource, KeyResolver, ResolvedCredential, TenantKeys};
pub use error::ProxyError;
pub use service::ProxyService;
