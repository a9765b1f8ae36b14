//! Web service health handlers.

use std::collections::BTreeMap;
use std::time::SystemTime;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::config::Config;
use crate::utils::iso_timestamp;

const SERVICE_NAME: &str = "web";

/// State shared with web handlers.
#[derive(Debug, Clone)]
pub struct WebState {
    /// Wall-clock process start, the base for `uptime`.
    pub started_at: SystemTime,
    /// Reported environment name.
    pub environment: String,
    /// Reported version.
    pub version: String,
}

impl WebState {
    /// Build state from configuration, starting the uptime clock now.
    pub fn from_config(config: &Config) -> Self {
        Self {
            started_at: SystemTime::now(),
            environment: config.app_env.clone(),
            version: config.app_version.clone(),
        }
    }

    /// Seconds since start.
    fn uptime_secs(&self) -> Result<f64, String> {
        SystemTime::now()
            .duration_since(self.started_at)
            .map(|elapsed| elapsed.as_secs_f64())
            .map_err(|e| format!("clock is behind process start by {:?}", e.duration()))
    }
}

/// Healthy report.
#[derive(Debug, Serialize)]
pub struct WebHealth {
    /// Fixed "ok".
    pub status: &'static str,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Seconds since start.
    pub uptime: f64,
    /// Environment name.
    pub environment: String,
    /// Service version.
    pub version: String,
    /// Service name.
    pub service: &'static str,
    /// Per-check results.
    pub checks: BTreeMap<&'static str, &'static str>,
}

/// Report returned when the health report cannot be built.
#[derive(Debug, Serialize)]
pub struct WebHealthError {
    /// Fixed "error".
    pub status: &'static str,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// What went wrong.
    pub error: String,
    /// Service name.
    pub service: &'static str,
}

fn build_report(state: &WebState) -> Result<WebHealth, String> {
    Ok(WebHealth {
        status: "ok",
        timestamp: iso_timestamp(),
        uptime: state.uptime_secs()?,
        environment: state.environment.clone(),
        version: state.version.clone(),
        service: SERVICE_NAME,
        checks: BTreeMap::from([("server", "healthy")]),
    })
}

/// GET health - 200 with the report, 503 if it cannot be built.
pub async fn health(State(state): State<WebState>) -> Response {
    match build_report(&state) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(reason) => {
            error!(reason = %reason, "Health report failed");
            let body = WebHealthError {
                status: "error",
                timestamp: iso_timestamp(),
                error: reason,
                service: SERVICE_NAME,
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// HEAD health - 200, no body.
pub async fn health_head() -> StatusCode {
    StatusCode::OK
}
