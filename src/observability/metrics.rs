//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route class, method, status
//! - `gateway_request_duration_seconds` (histogram): time to response headers
//! - `gateway_upstream_errors_total` (counter): proxied calls that failed before headers
//! - `gateway_interpolation_denied_total` (counter): placeholders left literal, by reason
//! - `gateway_store_puts_total` (counter): puts by outcome (created/updated/rejected)
//! - `gateway_store_blobs` (gauge): blobs held in memory
//! - `gateway_store_flush_total` (counter): snapshot writes by outcome
//! - `gateway_store_flush_duration_seconds` (histogram)

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route,
        "method" => method.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    counter!("gateway_upstream_errors_total").increment(1);
}

pub fn record_interpolation_denied(reason: &'static str) {
    counter!("gateway_interpolation_denied_total", "reason" => reason).increment(1);
}

pub fn record_store_put(outcome: &'static str) {
    counter!("gateway_store_puts_total", "outcome" => outcome).increment(1);
}

pub fn record_store_size(blobs: usize) {
    gauge!("gateway_store_blobs").set(blobs as f64);
}

pub fn record_flush(success: bool, elapsed: Duration) {
    let outcome = if success { "ok" } else { "error" };
    counter!("gateway_store_flush_total", "outcome" => outcome).increment(1);
    histogram!("gateway_store_flush_duration_seconds").record(elapsed.as_secs_f64());
}
