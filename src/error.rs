//! Unified error types for the parrot services.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ratelimit::TierName;

/// Startup and configuration errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid bind address.
    #[error("invalid bind address {addr}: {reason}")]
    BindAddress {
        /// The address that failed to parse.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// Metrics recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One offending location in a rejected request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field path or `line:column` location.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or unexpected request body.
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Body present without a JSON content type.
    #[error("unsupported media type: expected application/json")]
    UnsupportedMediaType,

    /// Body exceeds the configured ceiling.
    #[error("payload too large")]
    PayloadTooLarge,

    /// A rate-limit tier is exhausted for this client.
    #[error("too many requests: {tier} tier limit of {limit} reached, retry after {retry_after_secs}s")]
    RateLimited {
        /// The exhausted tier.
        tier: TierName,
        /// The tier's max requests per window.
        limit: u32,
        /// Seconds until the tier's window resets.
        retry_after_secs: u64,
    },

    /// Anything unexpected; details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON error body returned to callers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// HTTP status code.
    pub status_code: u16,
    /// Status reason phrase.
    pub error: &'static str,
    /// Human readable message.
    pub message: String,
    /// Offending fields, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let status = self.status();
        let (message, details) = match self {
            ApiError::Validation(errors) => {
                ("Request body validation failed".to_string(), Some(errors.clone()))
            }
            ApiError::Internal(_) => ("Internal server error".to_string(), None),
            other => (other.to_string(), None),
        };

        ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(reason) = &self {
            tracing::error!(reason = %reason, "Internal error");
        }

        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();

        if let ApiError::RateLimited {
            tier,
            retry_after_secs,
            ..
        } = &self
        {
            let headers = response.headers_mut();
            let value = HeaderValue::from(*retry_after_secs);
            headers.insert(header::RETRY_AFTER, value.clone());
            if let Ok(name) = HeaderName::try_from(format!("retry-after-{}", tier)) {
                headers.insert(name, value);
            }
        }

        response
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_maps_to_429_with_retry_headers() {
        let response = ApiError::RateLimited {
            tier: TierName::Short,
            limit: 10,
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        assert_eq!(response.headers()["retry-after-short"], "42");
    }

    #[test]
    fn internal_error_hides_reason() {
        let body = ApiError::Internal("db password leaked".to_string()).body();
        assert_eq!(body.status_code, 500);
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = ApiError::Validation(vec![FieldError {
            field: "line 1, column 5".to_string(),
            message: "expected value".to_string(),
        }]);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "validation failed: line 1, column 5: expected value");
        assert_eq!(err.body().details.map(|d| d.len()), Some(1));
    }
}
