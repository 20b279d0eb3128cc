//! Configuration loading from the process environment.
//!
//! Parsing goes through a lookup-function seam so unit tests never have to
//! mutate process-global environment variables.

use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::EdgeConfig;

impl EdgeConfig {
    /// Load configuration from the process environment, filling defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let host = nonempty(lookup("HOST")).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(lookup("PORT"), "PORT", 3001u16);
        config.listener.bind_address = format!("{}:{}", host, port);
        config.listener.request_timeout =
            Duration::from_secs(parse_or(lookup("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 30));

        config.upstream.bases = lookup("PUBLIC_API_BASE")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        config.upstream.timeout =
            Duration::from_secs(parse_or(lookup("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS", 10));

        config.credentials.default_key = nonempty(lookup("PUBLIC_API_KEY"));
        if let Some(name) = nonempty(lookup("PUBLIC_API_KEY_HEADER")) {
            config.credentials.header_name = name;
        }
        if let Some(prefix) = lookup("PUBLIC_API_KEY_PREFIX") {
            config.credentials.key_prefix = prefix;
        }
        config.credentials.tenant_keys = parse_tenant_keys(lookup("TENANT_API_KEYS"));
        config.credentials.default_tenant = nonempty(lookup("DEFAULT_TENANT"));

        if let Some(root) = nonempty(lookup("SITE_ROOT")) {
            config.site.root = PathBuf::from(root);
        }

        config.observability.metrics_enabled = lookup("METRICS_ENABLED")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if let Some(addr) = nonempty(lookup("METRICS_ADDRESS")) {
            config.observability.metrics_address = addr;
        }

        config
    }
}

/// Parse the tenant -> key map from its JSON form. Malformed input is
/// logged and treated as an empty map; it must never prevent startup.
fn parse_tenant_keys(raw: Option<String>) -> IndexMap<String, String> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return IndexMap::new();
    };
    match serde_json::from_str::<IndexMap<String, String>>(&raw) {
        Ok(map) => map,
        Err(error) => {
            tracing::warn!(%error, "Malformed TENANT_API_KEYS, ignoring tenant map");
            IndexMap::new()
        }
    }
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn parse_or<T: std::str::FromStr + Copy>(value: Option<String>, name: &str, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Unparseable value, using default");
            default
        }),
    }
}
