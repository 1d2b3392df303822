//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): time to response headers, by outcome
//! - `proxy_upstream_errors_total` (counter): upstream failures by kind
//! - `proxy_config_reloads_total` (counter): reload attempts by result
//!
//! # Design Decisions
//! - Recording is always safe: without an installed recorder the macros are no-ops
//! - Prometheus exporter runs its own listener, separate from proxied traffic

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the global Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream failure by classification.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record a configuration reload attempt.
pub fn record_reload(applied: bool) {
    let result = if applied { "applied" } else { "rejected" };
    metrics::counter!("proxy_config_reloads_total", "result" => result).increment(1);
}
