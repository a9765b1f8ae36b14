//! Axum middleware applying the tiered rate limiter.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::key::ClientKey;
use super::limiter::TieredRateLimiter;
use crate::error::ApiError;
use crate::metrics;

/// State handed to [`enforce_rate_limit`].
#[derive(Debug, Clone)]
pub struct RateLimitLayerState {
    /// Shared limiter.
    pub limiter: Arc<TieredRateLimiter>,
    /// Key clients by `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded_for: bool,
}

/// Reject the request with 429 if any tier is exhausted for its client.
///
/// Admitted responses carry the per-tier usage headers.
pub async fn enforce_rate_limit(
    State(state): State<RateLimitLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let key = ClientKey::from_request(&request, state.trust_forwarded_for);

    match state.limiter.check(&key) {
        Ok(snapshot) => {
            let mut response = next.run(request).await;
            snapshot.apply_headers(response.headers_mut());
            response
        }
        Err(err) => {
            if let ApiError::RateLimited {
                tier,
                retry_after_secs,
                ..
            } = &err
            {
                warn!(client = %key, tier = %tier, retry_after_secs, "Rate limit exceeded");
                metrics::inc_rate_limited(*tier);
            }
            err.into_response()
        }
    }
}
