//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → env.rs (read & parse variables)
//!     → EdgeConfig (validated defaults filled in)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults so an empty environment still boots
//! - A malformed tenant-key map is logged and ignored, never fatal

pub mod env;
pub mod schema;

pub use schema::CacheConfig;
pub use schema::CredentialConfig;
pub use schema::EdgeConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::SiteConfig;
pub use schema::UpstreamConfig;
