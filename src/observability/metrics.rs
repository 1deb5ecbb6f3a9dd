//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cinder_requests_total` (counter): requests by method, status, route
//! - `cinder_request_duration_seconds` (histogram): time to response head
//! - `cinder_upstream_errors_total` (counter): proxy failures by kind
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so tests and embedders pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Which handler produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Proxy,
    Static,
    Spa,
}

impl RouteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteKind::Proxy => "proxy",
            RouteKind::Static => "static",
            RouteKind::Spa => "spa",
        }
    }
}

/// Install the Prometheus recorder with its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Bounded label for a request method; extension methods share one series.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "other",
    }
}

pub fn record_request(method: &str, status: u16, route: RouteKind, start: Instant) {
    let labels = [
        ("method", method_label(method).to_string()),
        ("status", status.to_string()),
        ("route", route.as_str().to_string()),
    ];
    metrics::counter!("cinder_requests_total", &labels).increment(1);
    metrics::histogram!("cinder_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("cinder_upstream_errors_total", "kind" => kind).increment(1);
}
