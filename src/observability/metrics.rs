//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_proxy_requests_total` (counter): proxied requests by method, status
//! - `edge_proxy_request_duration_seconds` (histogram): forwarding latency
//! - `edge_proxy_cache_lookups_total` (counter): cache hits and misses
//! - `edge_proxy_cache_entries` (gauge): live cache entries
//!
//! Recording helpers are no-ops until an exporter is installed, so tests
//! and metric-disabled deployments pay nothing.

use axum::http::StatusCode;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(error) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(%error, "Failed to install Prometheus exporter");
        return;
    }
    describe_counter!(
        "edge_proxy_requests_total",
        "Proxied requests by method and response status"
    );
    describe_histogram!(
        "edge_proxy_request_duration_seconds",
        "Time spent handling a proxied request"
    );
    describe_counter!(
        "edge_proxy_cache_lookups_total",
        "Response cache lookups by result"
    );
    describe_gauge!("edge_proxy_cache_entries", "Live response cache entries");
    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_proxy_request(method: &str, status: StatusCode, started: Instant) {
    counter!(
        "edge_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("edge_proxy_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("edge_proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("edge_proxy_cache_entries").set(entries as f64);
}
