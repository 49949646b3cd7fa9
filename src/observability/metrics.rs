//! Metrics collection and exposition.
//!
//! # Metrics
//! - `insights_requests_total` (counter): requests by method, status
//! - `insights_request_duration_seconds` (histogram): latency distribution
//! - `insights_envelopes_total` (counter): response envelopes built, by kind
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter serves its own scrape endpoint

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    metrics::counter!("insights_requests_total", &labels).increment(1);
    metrics::histogram!("insights_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_envelope(kind: &'static str) {
    metrics::counter!("insights_envelopes_total", "kind" => kind).increment(1);
}
