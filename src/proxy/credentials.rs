//! Upstream credential resolution.
//!
//! # Responsibilities
//! - Decide which API key (and tenant label) an inbound request maps to
//! - Apply a fixed precedence chain over the configured credential sources
//! - Recover a tenant label from a bare key via reverse lookup
//!
//! # Design Decisions
//! - The chain is an ordered list of strategy functions; the first rule
//!   producing a result wins, which keeps every rule independently testable
//! - Resolution is pure: no side effects, nothing stored per request
//! - The resolved tenant is one the map actually matched; an inbound
//!   `X-Tenant` value that matched nothing is not echoed into the result

use axum::http::{HeaderMap, HeaderName};
use indexmap::IndexMap;

use crate::config::CredentialConfig;

/// Inbound header naming the tenant whose key should be used.
pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant");

/// Query parameter carrying a key directly.
const KEY_QUERY_PARAM: &str = "api_key";

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    InboundHeader,
    QueryParam,
    TenantLookup,
    GlobalDefault,
    None,
}

/// The outcome of credential resolution for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCredential {
    pub key: Option<String>,
    pub source: CredentialSource,
    pub tenant: Option<String>,
}

impl ResolvedCredential {
    fn none() -> Self {
        Self {
            key: None,
            source: CredentialSource::None,
            tenant: None,
        }
    }
}

/// Tenant label -> API key, immutable after startup.
#[derive(Debug, Clone, Default)]
pub struct TenantKeys {
    keys: IndexMap<String, String>,
}

impl TenantKeys {
    pub fn new(keys: IndexMap<String, String>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Look up a tenant's key: exact label first, then the lowercased label.
    /// Returns the configured label alongside the key.
    pub fn lookup(&self, tenant: &str) -> Option<(&str, &str)> {
        self.keys
            .get_key_value(tenant)
            .or_else(|| {
                let lowered = tenant.to_lowercase();
                self.keys.get_key_value(lowered.as_str())
            })
            .map(|(label, key)| (label.as_str(), key.as_str()))
    }

    /// Recover the tenant label for a bare key. The first configured tenant
    /// wins when several share a key.
    pub fn tenant_for_key(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(_, v)| v.as_str() == key)
            .map(|(label, _)| label.as_str())
    }
}

/// Resolves the upstream credential for an inbound request.
pub struct KeyResolver {
    header_name: HeaderName,
    tenants: TenantKeys,
    default_key: Option<String>,
    default_tenant: Option<String>,
}

type Rule = fn(&KeyResolver, &HeaderMap, &[(String, String)]) -> Option<ResolvedCredential>;

impl KeyResolver {
    pub fn new(config: &CredentialConfig) -> Self {
        let header_name = HeaderName::try_from(config.header_name.as_str())
            .unwrap_or_else(|error| {
                tracing::warn!(name = %config.header_name, %error, "Invalid credential header name, using X-API-Key");
                HeaderName::from_static("x-api-key")
            });
        Self {
            header_name,
            tenants: TenantKeys::new(config.tenant_keys.clone()),
            default_key: config.default_key.clone(),
            default_tenant: config.default_tenant.clone(),
        }
    }

    /// The configured credential header name (lowercased).
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// True when the server is configured with a per-tenant key map.
    pub fn multi_tenant(&self) -> bool {
        !self.tenants.is_empty()
    }

    pub fn tenants(&self) -> &TenantKeys {
        &self.tenants
    }

    /// Apply the precedence chain; the first rule that yields wins.
    pub fn resolve(&self, headers: &HeaderMap, query: &[(String, String)]) -> ResolvedCredential {
        const RULES: [Rule; 4] = [
            KeyResolver::from_credential_header,
            KeyResolver::from_query_param,
            KeyResolver::from_tenant_header,
            KeyResolver::from_global_default,
        ];
        for rule in RULES {
            if let Some(resolved) = rule(self, headers, query) {
                return resolved;
            }
        }
        ResolvedCredential::none()
    }

    fn from_credential_header(
        &self,
        headers: &HeaderMap,
        _query: &[(String, String)],
    ) -> Option<ResolvedCredential> {
        let key = headers.get(&self.header_name)?.to_str().ok()?;
        if key.is_empty() {
            return None;
        }
        Some(ResolvedCredential {
            key: Some(key.to_string()),
            source: CredentialSource::InboundHeader,
            tenant: self.tenants.tenant_for_key(key).map(str::to_string),
        })
    }

    fn from_query_param(
        &self,
        _headers: &HeaderMap,
        query: &[(String, String)],
    ) -> Option<ResolvedCredential> {
        let (_, key) = query
            .iter()
            .find(|(name, value)| name.as_str() == KEY_QUERY_PARAM && !value.is_empty())?;
        Some(ResolvedCredential {
            key: Some(key.clone()),
            source: CredentialSource::QueryParam,
            tenant: self.tenants.tenant_for_key(key).map(str::to_string),
        })
    }

    fn from_tenant_header(
        &self,
        headers: &HeaderMap,
        _query: &[(String, String)],
    ) -> Option<ResolvedCredential> {
        let tenant = headers.get(TENANT_HEADER)?.to_str().ok()?;
        let (label, key) = self.tenants.lookup(tenant)?;
        Some(ResolvedCredential {
            key: Some(key.to_string()),
            source: CredentialSource::TenantLookup,
            tenant: Some(label.to_string()),
        })
    }

    fn from_global_default(
        &self,
        _headers: &HeaderMap,
        _query: &[(String, String)],
    ) -> Option<ResolvedCredential> {
        let key = self.default_key.as_ref()?;
        Some(ResolvedCredential {
            key: Some(key.clone()),
            source: CredentialSource::GlobalDefault,
            tenant: self.default_tenant.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver(config: CredentialConfig) -> KeyResolver {
        KeyResolver::new(&config)
    }

    fn tenant_config() -> CredentialConfig {
        CredentialConfig {
            tenant_keys: IndexMap::from([
                ("acme".to_string(), "k1".to_string()),
                ("globex".to_string(), "k2".to_string()),
            ]),
            ..CredentialConfig::default()
        }
    }

    fn header(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_header_beats_every_other_source() {
        let mut config = tenant_config();
        config.default_key = Some("global".to_string());
        let resolver = resolver(config);

        let mut headers = header("x-api-key", "k2");
        headers.insert("x-tenant", HeaderValue::from_static("acme"));
        let resolved = resolver.resolve(&headers, &query(&[("api_key", "k1")]));

        assert_eq!(resolved.source, CredentialSource::InboundHeader);
        assert_eq!(resolved.key.as_deref(), Some("k2"));
        assert_eq!(resolved.tenant.as_deref(), Some("globex"));
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let resolver = resolver(tenant_config());
        let headers = header("X-API-KEY", "k1");
        let resolved = resolver.resolve(&headers, &[]);
        assert_eq!(resolved.source, CredentialSource::InboundHeader);
        assert_eq!(resolved.tenant.as_deref(), Some("acme"));
    }

    #[test]
    fn test_query_param_with_tenant_inference() {
        let resolver = resolver(tenant_config());
        let resolved = resolver.resolve(&HeaderMap::new(), &query(&[("api_key", "k1")]));
        assert_eq!(resolved.source, CredentialSource::QueryParam);
        assert_eq!(resolved.key.as_deref(), Some("k1"));
        assert_eq!(resolved.tenant.as_deref(), Some("acme"));
    }

    #[test]
    fn test_unknown_key_resolves_without_tenant() {
        let resolver = resolver(tenant_config());
        let resolved = resolver.resolve(&HeaderMap::new(), &query(&[("api_key", "mystery")]));
        assert_eq!(resolved.key.as_deref(), Some("mystery"));
        assert_eq!(resolved.tenant, None);
    }

    #[test]
    fn test_tenant_header_exact_then_lowercase() {
        let resolver = resolver(tenant_config());

        let resolved = resolver.resolve(&header("x-tenant", "acme"), &[]);
        assert_eq!(resolved.source, CredentialSource::TenantLookup);
        assert_eq!(resolved.key.as_deref(), Some("k1"));
        assert_eq!(resolved.tenant.as_deref(), Some("acme"));

        let resolved = resolver.resolve(&header("x-tenant", "ACME"), &[]);
        assert_eq!(resolved.key.as_deref(), Some("k1"));
        assert_eq!(resolved.tenant.as_deref(), Some("acme"));
    }

    #[test]
    fn test_unknown_tenant_falls_through_to_default() {
        let mut config = tenant_config();
        config.default_key = Some("global".to_string());
        config.default_tenant = Some("house".to_string());
        let resolver = resolver(config);

        let resolved = resolver.resolve(&header("x-tenant", "nobody"), &[]);
        assert_eq!(resolved.source, CredentialSource::GlobalDefault);
        assert_eq!(resolved.key.as_deref(), Some("global"));
        assert_eq!(resolved.tenant.as_deref(), Some("house"));
    }

    #[test]
    fn test_nothing_resolves() {
        let resolver = resolver(tenant_config());
        let resolved = resolver.resolve(&header("x-tenant", "nobody"), &[]);
        assert_eq!(resolved.source, CredentialSource::None);
        assert_eq!(resolved.key, None);
        assert_eq!(resolved.tenant, None);
    }

    #[test]
    fn test_duplicate_key_reverse_lookup_prefers_first_configured() {
        let config = CredentialConfig {
            tenant_keys: IndexMap::from([
                ("first".to_string(), "shared".to_string()),
                ("second".to_string(), "shared".to_string()),
            ]),
            ..CredentialConfig::default()
        };
        let resolver = resolver(config);
        let resolved = resolver.resolve(&HeaderMap::new(), &query(&[("api_key", "shared")]));
        assert_eq!(resolved.tenant.as_deref(), Some("first"));
    }
}
