//! Metrics collection and exposition.
//!
//! # Metrics
//! - `facade_requests_total` (counter): forwarded requests by operation, method, status
//! - `facade_request_duration_seconds` (histogram): upstream round trip by operation
//! - `facade_rejected_requests_total` (counter): precondition failures by operation, reason
//!
//! Without an installed recorder these calls are no-ops.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::Operation;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one forwarded request. `status` is the upstream status, or the
/// facade's own status when the upstream call failed.
pub fn record_request(operation: Operation, method: &Method, status: u16, start: Instant) {
    metrics::counter!(
        "facade_requests_total",
        "operation" => operation.name(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "facade_request_duration_seconds",
        "operation" => operation.name()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a request refused before any upstream call.
pub fn record_rejected(operation: Operation, reason: &'static str) {
    metrics::counter!(
        "facade_rejected_requests_total",
        "operation" => operation.name(),
        "reason" => reason
    )
    .increment(1);
}
