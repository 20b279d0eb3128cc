//! Forwarding proxy orchestration.
//!
//! # Responsibilities
//! - Build the upstream URL from the inbound path and query
//! - Resolve credentials and enforce the multi-tenant fail-fast rule
//! - Serve cacheable GETs from the response cache
//! - Relay upstream status/body/content-type back to the caller
//!
//! # Design Decisions
//! - Outbound headers are built fresh; inbound headers are never forwarded
//!   wholesale
//! - Error payloads are always `{"error": ...}` with the relevant status;
//!   an unexpected internal failure becomes a logged 500, never a crash

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use url::Url;

use crate::cache::{CacheHit, ResponseCache, TtlClass};
use crate::catalogue;
use crate::config::{CacheConfig, EdgeConfig};
use crate::observability::metrics;

use super::credentials::{KeyResolver, ResolvedCredential, TENANT_HEADER};
use super::error::ProxyError;
use super::forward::UpstreamClient;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MISSING_CREDENTIAL_HINT: &str =
    "No API key resolved. Supply the credential header, an api_key query parameter, or a known X-Tenant.";

/// The forwarding proxy: owns the cache, the resolver, and the upstream
/// client. One instance per process, shared through the router state.
pub struct ProxyService {
    base: Option<Url>,
    resolver: KeyResolver,
    key_prefix: String,
    cache: ResponseCache,
    cache_config: CacheConfig,
    client: UpstreamClient,
}

impl ProxyService {
    pub fn new(config: &EdgeConfig) -> Result<Self, ProxyError> {
        let base = match config.upstream.primary() {
            None => None,
            Some(raw) => match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(error) => {
                    tracing::warn!(base = raw, %error, "Invalid upstream base, proxying disabled");
                    None
                }
            },
        };
        Ok(Self {
            base,
            resolver: KeyResolver::new(&config.credentials),
            key_prefix: config.credentials.key_prefix.clone(),
            cache: ResponseCache::new(config.cache.max_entries),
            cache_config: config.cache.clone(),
            client: UpstreamClient::new(config.upstream.timeout, config.upstream.max_redirects)?,
        })
    }

    /// The configured credential header name (used by the CORS layer).
    pub fn credential_header(&self) -> &HeaderName {
        self.resolver.header_name()
    }

    /// Handle one inbound `/proxy/*` request. Never fails: any internal
    /// error is logged with request context and turned into a 500.
    pub async fn forward(
        &self,
        method: &Method,
        path: &str,
        raw_query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response {
        let started = Instant::now();
        let response = match self.try_forward(method, path, raw_query, headers, body).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(method = %method, path, %error, "Proxy forward error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Proxy error")
            }
        };
        metrics::record_proxy_request(method.as_str(), response.status(), started);
        response
    }

    async fn try_forward(
        &self,
        method: &Method,
        path: &str,
        raw_query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let Some(base) = &self.base else {
            return Ok(error_response(
                StatusCode::BAD_GATEWAY,
                "Upstream API not configured",
            ));
        };

        let query = parse_query(raw_query);
        let upstream_url = build_upstream_url(base, path, &query)?;
        let resolved = self.resolver.resolve(headers, &query);

        // In multi-tenant mode a request that resolved neither a key nor a
        // tenant can only produce an opaque upstream rejection; refuse it
        // here with a hint instead.
        if self.resolver.multi_tenant() && resolved.key.is_none() && resolved.tenant.is_none() {
            return Ok(error_response(StatusCode::BAD_REQUEST, MISSING_CREDENTIAL_HINT));
        }

        tracing::debug!(
            method = %method,
            url = %upstream_url,
            source = ?resolved.source,
            tenant = resolved.tenant.as_deref(),
            "Proxying request upstream"
        );

        let cache_key = upstream_url.to_string();
        let storable = *method == Method::GET;
        // A no-cache/no-store request skips the lookup but still refreshes
        // the stored entry for later callers.
        if storable && !bypass_cache(headers) {
            if let Some(hit) = self.cache.get(&cache_key) {
                metrics::record_cache_lookup(true);
                return Ok(cached_response(hit));
            }
            metrics::record_cache_lookup(false);
        }

        let outbound_headers = self.outbound_headers(headers, &resolved)?;
        let outbound_body = outbound_body(method, body);
        let response = self
            .client
            .fetch(method.clone(), upstream_url, outbound_headers, outbound_body)
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Retry later.",
            ));
        }
        if !status.is_success() {
            tracing::warn!(method = %method, path, status = %status, "Upstream returned non-success");
            return Ok(error_response(status, "Upstream request failed"));
        }

        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => {
                let mapped = match catalogue::product_shape(path) {
                    Some(shape) => catalogue::map_payload(shape, parsed),
                    None => parsed,
                };
                let ttl = self.cache_config.ttl_for(TtlClass::for_path(path));
                if storable {
                    self.cache.set(&cache_key, mapped.clone(), ttl);
                }
                Ok(json_response(&mapped, storable.then_some(ttl)))
            }
            // Not JSON: pass the raw text through under the upstream's own
            // status and content type, uncached.
            Err(_) => Ok(raw_response(status, content_type, text)),
        }
    }

    fn outbound_headers(
        &self,
        inbound: &HeaderMap,
        resolved: &ResolvedCredential,
    ) -> Result<HeaderMap, ProxyError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &resolved.key {
            let value = HeaderValue::from_str(&format!("{}{}", self.key_prefix, key))?;
            headers.insert(self.resolver.header_name().clone(), value);
        }
        match inbound.get(TENANT_HEADER) {
            Some(tenant) => {
                headers.insert(TENANT_HEADER, tenant.clone());
            }
            None => {
                if let Some(tenant) = &resolved.tenant {
                    headers.insert(TENANT_HEADER, HeaderValue::from_str(tenant)?);
                }
            }
        }
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(content_type) = inbound.get(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, content_type.clone());
        }
        if let Some(request_id) = inbound.get(X_REQUEST_ID) {
            headers.insert(X_REQUEST_ID, request_id.clone());
        }
        Ok(headers)
    }
}

/// Decode the inbound query string into ordered pairs.
fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

/// Join the inbound path onto the upstream base and copy the inbound query
/// across. Repeated inbound keys collapse to the last value, keeping the
/// first occurrence's position.
fn build_upstream_url(base: &Url, path: &str, query: &[(String, String)]) -> Result<Url, ProxyError> {
    let path = if path.is_empty() { "/" } else { path };
    let mut url = base.join(path)?;

    let mut merged: IndexMap<&str, &str> = IndexMap::new();
    for (name, value) in query {
        merged.insert(name.as_str(), value.as_str());
    }
    if !merged.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in &merged {
            pairs.append_pair(name, value);
        }
        drop(pairs);
    }
    Ok(url)
}

/// Forward a body only when it is JSON, re-serialized; GET/HEAD and
/// non-JSON bodies are sent bodyless.
fn outbound_body(method: &Method, body: Bytes) -> Option<Bytes> {
    if *method == Method::GET || *method == Method::HEAD || body.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_slice(&body).ok()?;
    serde_json::to_vec(&value).ok().map(Bytes::from)
}

fn bypass_cache(headers: &HeaderMap) -> bool {
    headers
        .get(header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("no-cache") || value.contains("no-store"))
        .unwrap_or(false)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn cache_control(fresh_for: Duration) -> (HeaderName, String) {
    (
        header::CACHE_CONTROL,
        format!("public, max-age={}", fresh_for.as_secs()),
    )
}

fn cached_response(hit: CacheHit) -> Response {
    (StatusCode::OK, [cache_control(hit.fresh_for)], Json(hit.data)).into_response()
}

fn json_response(value: &Value, ttl: Option<Duration>) -> Response {
    match ttl {
        Some(ttl) => (StatusCode::OK, [cache_control(ttl)], Json(value.clone())).into_response(),
        None => Json(value.clone()).into_response(),
    }
}

fn raw_response(status: StatusCode, content_type: Option<HeaderValue>, text: String) -> Response {
    let mut response = (status, text).into_response();
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.example.com/v1/").unwrap()
    }

    fn pairs(input: &[(&str, &str)]) -> Vec<(String, String)> {
        input
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_upstream_url_joins_absolute_path() {
        let url = build_upstream_url(&base(), "/public/products", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/public/products");
    }

    #[test]
    fn test_upstream_url_copies_query_in_order() {
        let url = build_upstream_url(
            &base(),
            "/public/products",
            &pairs(&[("per_page", "10"), ("sort", "name")]),
        )
        .unwrap();
        assert_eq!(url.query(), Some("per_page=10&sort=name"));
    }

    #[test]
    fn test_repeated_query_keys_collapse_to_last_value() {
        let url = build_upstream_url(
            &base(),
            "/items",
            &pairs(&[("page", "1"), ("sort", "name"), ("page", "2")]),
        )
        .unwrap();
        assert_eq!(url.query(), Some("page=2&sort=name"));
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let url = build_upstream_url(&base(), "", &[]).unwrap();
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_outbound_body_json_only() {
        assert!(outbound_body(&Method::GET, Bytes::from_static(b"{\"a\":1}")).is_none());
        assert!(outbound_body(&Method::POST, Bytes::new()).is_none());
        assert!(outbound_body(&Method::POST, Bytes::from_static(b"not json")).is_none());

        let forwarded = outbound_body(&Method::POST, Bytes::from_static(b"{\"a\": 1}")).unwrap();
        assert_eq!(forwarded, Bytes::from_static(b"{\"a\":1}"));
    }

    #[test]
    fn test_cache_bypass_header() {
        let mut headers = HeaderMap::new();
        assert!(!bypass_cache(&headers));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(bypass_cache(&headers));
    }

    #[test]
    fn test_query_parsing_decodes_pairs() {
        let parsed = parse_query(Some("a=1&b=two%20words"));
        assert_eq!(parsed, pairs(&[("a", "1"), ("b", "two words")]));
        assert!(parse_query(None).is_empty());
    }
}
