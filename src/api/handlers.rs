//! HTTP API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::probe::{DependencyProbe, NoopProbe};
use super::validation::{RawJson, ValidatedJson};
use crate::config::Config;
use crate::metrics;
use crate::ratelimit::TieredRateLimiter;
use crate::utils::iso_timestamp;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Port reported by the status endpoint.
    pub port: u16,
    /// Dependency reported as `database` by the health endpoint.
    pub probe: Arc<dyn DependencyProbe>,
    /// Shared rate limiter.
    pub limiter: Arc<TieredRateLimiter>,
    /// CORS allow-list.
    pub allowed_origins: Vec<String>,
    /// Echo body ceiling in bytes.
    pub body_limit_bytes: usize,
    /// Key clients by `X-Forwarded-For`.
    pub trust_forwarded_for: bool,
    /// Apply the rate limiter to health routes too.
    pub rate_limit_health: bool,
}

impl AppState {
    /// Build state from configuration with the given limiter.
    pub fn from_config(config: &Config, limiter: Arc<TieredRateLimiter>) -> Self {
        Self {
            port: config.port,
            probe: Arc::new(NoopProbe),
            limiter,
            allowed_origins: config.cors_origins(),
            body_limit_bytes: config.body_limit_bytes,
            trust_forwarded_for: config.trust_forwarded_for,
            rate_limit_health: config.rate_limit_health,
        }
    }

    /// Replace the health dependency probe.
    pub fn with_probe(mut self, probe: Arc<dyn DependencyProbe>) -> Self {
        self.probe = probe;
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: &'static str,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// "connected" or "disconnected".
    pub database: &'static str,
    /// Probe failure reason, when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Process status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Fixed "Server is running".
    pub status: &'static str,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Listening port.
    pub port: u16,
}

/// Echo envelope.
#[derive(Debug, Serialize)]
pub struct ParrotResponse {
    /// The request body, unchanged.
    pub parrot: Value,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Health check handler - 200 when the dependency probe passes, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let (code, response) = match state.probe.check().await {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                timestamp: iso_timestamp(),
                database: "connected",
                error: None,
            },
        ),
        Err(reason) => {
            warn!(reason = %reason, "Health dependency check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "unhealthy",
                    timestamp: iso_timestamp(),
                    database: "disconnected",
                    error: Some(reason),
                },
            )
        }
    };

    metrics::record_request("health", start);
    (code, Json(response))
}

/// Status handler - reports that the process is up and its port.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let response = StatusResponse {
        status: "Server is running",
        timestamp: iso_timestamp(),
        port: state.port,
    };
    metrics::record_request("health_status", start);
    Json(response)
}

/// Echo handler - wraps the body in `{parrot, timestamp}`, 201 like any POST.
pub async fn parrot(ValidatedJson(body): ValidatedJson<Value>) -> impl IntoResponse {
    let start = Instant::now();
    debug!("Echoing request body");
    metrics::record_echo_bytes(body.to_string().len());
    let response = ParrotResponse {
        parrot: body,
        timestamp: iso_timestamp(),
    };
    metrics::record_request("parrot", start);
    (StatusCode::CREATED, Json(response))
}

/// Raw echo handler - returns the body bytes as sent.
pub async fn parrot_raw(RawJson(body): RawJson) -> Response {
    let start = Instant::now();
    metrics::record_echo_bytes(body.len());
    metrics::record_request("parrot_raw", start);
    (
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
