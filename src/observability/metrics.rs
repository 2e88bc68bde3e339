//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_admission_rejected_total` (counter): paths refused by the gate
//! - `gateway_rate_limited_total` (counter): 429s by scope
//! - `gateway_counter_store_errors_total` (counter): failed store round-trips
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_admission_rejected() {
    metrics::counter!("gateway_admission_rejected_total").increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    metrics::counter!("gateway_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_counter_store_error() {
    metrics::counter!("gateway_counter_store_errors_total").increment(1);
}

pub fn record_handler_panic() {
    metrics::counter!("gateway_handler_panics_total").increment(1);
}
