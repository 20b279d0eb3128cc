//! Configuration schema definitions.
//!
//! The complete configuration structure for the edge server. Values come
//! from the process environment (see `env.rs`); every field has a default
//! so tests can build configs directly.

use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::TtlClass;

/// Root configuration for the edge server.
#[derive(Debug, Clone, Default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, inbound timeout).
    pub listener: ListenerConfig,

    /// Upstream catalogue API configuration.
    pub upstream: UpstreamConfig,

    /// Credential sources for upstream requests.
    pub credentials: CredentialConfig,

    /// Response cache sizing and TTL classes.
    pub cache: CacheConfig,

    /// Static site serving.
    pub site: SiteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,

    /// Total time budget for handling one inbound request.
    pub request_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Upstream catalogue API configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Configured API base URLs; the first entry is the primary target.
    pub bases: Vec<String>,

    /// Per-attempt timeout for upstream calls.
    pub timeout: Duration,

    /// Maximum redirect hops to follow before relaying the response as-is.
    pub max_redirects: usize,
}

impl UpstreamConfig {
    /// The primary upstream base, if any is configured.
    pub fn primary(&self) -> Option<&str> {
        self.bases.first().map(String::as_str)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            bases: Vec::new(),
            timeout: Duration::from_secs(10),
            max_redirects: 3,
        }
    }
}

/// Credential sources for upstream requests.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Header name used to carry the API key upstream.
    pub header_name: String,

    /// Prefix prepended to the key value (e.g. "Bearer ").
    pub key_prefix: String,

    /// Process-wide default key, used when nothing else resolves.
    pub default_key: Option<String>,

    /// Tenant label -> API key, in configured order.
    pub tenant_keys: IndexMap<String, String>,

    /// Tenant label reported upstream when the default key is used.
    pub default_tenant: Option<String>,
}

impl CredentialConfig {
    /// True when any upstream credential is configured at all.
    pub fn any_configured(&self) -> bool {
        self.default_key.is_some() || !self.tenant_keys.is_empty()
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            header_name: "X-API-Key".to_string(),
            key_prefix: String::new(),
            default_key: None,
            tenant_keys: IndexMap::new(),
            default_tenant: None,
        }
    }
}

/// Response cache sizing and TTL classes.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries before oldest-first eviction.
    pub max_entries: usize,

    /// TTL for listing endpoints.
    pub listing_ttl: Duration,

    /// TTL for single-item detail endpoints.
    pub detail_ttl: Duration,
}

impl CacheConfig {
    /// TTL for the given endpoint class.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Listing => self.listing_ttl,
            TtlClass::Detail => self.detail_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            listing_ttl: Duration::from_secs(600),
            detail_ttl: Duration::from_secs(300),
        }
    }
}

/// Static site serving.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Directory holding the HTML pages and the `static/` asset tree.
    pub root: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Address for the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
