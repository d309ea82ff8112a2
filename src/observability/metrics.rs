//! Metrics collection and exposition.
//!
//! # Metrics
//! - `drm_proxy_requests_total` (counter): requests by route and status
//! - `drm_proxy_request_duration_seconds` (histogram): time to response headers
//! - `drm_proxy_upstream_errors_total` (counter): failures by route and kind
//! - `drm_proxy_bytes_relayed_total` (counter): body bytes streamed to callers
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("drm_proxy_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    histogram!("drm_proxy_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(route: &'static str, kind: &'static str) {
    counter!("drm_proxy_upstream_errors_total", "route" => route, "kind" => kind).increment(1);
}

pub fn record_bytes_relayed(route: &'static str, bytes: u64) {
    counter!("drm_proxy_bytes_relayed_total", "route" => route).increment(bytes);
}
