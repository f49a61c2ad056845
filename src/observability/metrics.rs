//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): inbound requests by method, status
//! - `http_request_duration_seconds` (histogram): inbound latency by method
//! - `http_panics_total` (counter): handler panics recovered
//! - `http_calls_total` (counter): outbound calls by method, outcome
//! - `http_call_duration_seconds` (histogram): outbound latency by method
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_panic() {
    metrics::counter!("http_panics_total").increment(1);
}

/// `outcome` is the status code, `error`, or `no_response`.
pub fn record_call(method: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "http_calls_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("http_call_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}
