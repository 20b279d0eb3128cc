//! Observability subsystem.
//!
//! Structured logs go through `tracing` (initialized in `main`); request
//! counters, latency histograms, and the cache gauge live here and are
//! exported in Prometheus format when enabled.

pub mod metrics;
