//! Prometheus metrics for request handling and rate limiting.
//!
//! This module provides metrics for:
//! - Per-route request counts and latency
//! - Rate-limit rejections by tier
//! - Echo payload sizes
//! - Tracked rate-limit clients

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::error::ServiceError;
use crate::ratelimit::TierName;

// === Metric Name Constants ===

/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Rate-limited requests counter metric name.
pub const METRIC_RATE_LIMITED: &str = "rate_limited_total";
/// Echo body size metric name.
pub const METRIC_ECHO_BODY_BYTES: &str = "echo_body_bytes";
/// Tracked rate-limit clients gauge metric name.
pub const METRIC_TRACKED_CLIENTS: &str = "rate_limit_tracked_clients";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup; the handle renders `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, ServiceError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServiceError::Metrics(e.to_string()))?;

    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of handled HTTP requests");
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP handler latency in milliseconds"
    );
    describe_counter!(
        METRIC_RATE_LIMITED,
        "Total number of requests rejected by the rate limiter"
    );
    describe_histogram!(METRIC_ECHO_BODY_BYTES, "Size of echoed request bodies in bytes");
    describe_gauge!(
        METRIC_TRACKED_CLIENTS,
        "Number of clients with live rate-limit windows"
    );

    debug!("Metrics initialized");
    Ok(handle)
}

/// Count a handled request and record its latency.
pub fn record_request(route: &'static str, start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    counter!(METRIC_HTTP_REQUESTS, "route" => route).increment(1);
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "route" => route).record(latency_ms);
}

/// Increment the rate-limited counter for a tier.
pub fn inc_rate_limited(tier: TierName) {
    counter!(METRIC_RATE_LIMITED, "tier" => tier.to_string()).increment(1);
}

/// Record the size of an echoed body.
pub fn record_echo_bytes(len: usize) {
    histogram!(METRIC_ECHO_BODY_BYTES).record(len as f64);
}

/// Set the number of tracked rate-limit clients.
pub fn set_tracked_clients(count: usize) {
    gauge!(METRIC_TRACKED_CLIENTS).set(count as f64);
}
