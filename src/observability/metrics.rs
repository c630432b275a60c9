//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): requests by route, status
//! - `bridge_request_duration_seconds` (histogram): latency by route
//! - `bridge_rate_limited_total` (counter): rejections by platform
//! - `bridge_upstream_calls_total` (counter): vendor calls by platform, outcome
//! - `bridge_sessions_active` (gauge): sessions in the store

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "bridge_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("bridge_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(platform: &str) {
    metrics::counter!("bridge_rate_limited_total", "platform" => platform.to_string()).increment(1);
}

pub fn record_rate_limit_overflow() {
    metrics::counter!("bridge_rate_limit_overflow_total").increment(1);
}

pub fn record_upstream_call(platform: &str, outcome: &'static str) {
    metrics::counter!(
        "bridge_upstream_calls_total",
        "platform" => platform.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_active_sessions(count: usize) {
    metrics::gauge!("bridge_sessions_active").set(count as f64);
}

/// Middleware recording request count and latency per matched route.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_request(&route, response.status().as_u16(), start);
    response
}
