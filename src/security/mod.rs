//! Security subsystem.
//!
//! Response-header hardening for the site routes. The proxy's own access
//! rules (credential resolution, fail-fast) live in `proxy`.

pub mod headers;
