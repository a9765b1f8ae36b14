//! Tiered rate limiter over a pluggable counter store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use super::key::ClientKey;
use super::store::{CounterStore, Decision, InMemoryStore, TierUsage};
use super::tier::Tier;
use crate::error::ApiError;
use crate::metrics;

/// Per-tier usage for an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Usage per tier, in tier order.
    pub usage: Vec<TierUsage>,
}

impl RateLimitSnapshot {
    /// Add `X-RateLimit-{Limit,Remaining,Reset}-<tier>` headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        for usage in &self.usage {
            let name = usage.tier.name;
            let values = [
                ("limit", u64::from(usage.tier.limit)),
                ("remaining", u64::from(usage.remaining())),
                ("reset", ceil_secs(usage.reset_after)),
            ];
            for (field, value) in values {
                let header = format!("x-ratelimit-{}-{}", field, name);
                if let Ok(header) = HeaderName::try_from(header) {
                    headers.insert(header, HeaderValue::from(value));
                }
            }
        }
    }
}

/// Enforces several tiers at once; a request must pass all of them.
#[derive(Debug, Clone)]
pub struct TieredRateLimiter {
    tiers: Vec<Tier>,
    store: Arc<dyn CounterStore>,
}

impl TieredRateLimiter {
    /// Create a limiter over the given tiers and store.
    pub fn new(tiers: Vec<Tier>, store: Arc<dyn CounterStore>) -> Self {
        Self { tiers, store }
    }

    /// Default tier table over an in-memory store.
    pub fn with_defaults() -> Self {
        Self::new(Tier::defaults(), Arc::new(InMemoryStore::new()))
    }

    /// Configured tiers.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    /// Check and count a request from `key` now.
    pub fn check(&self, key: &ClientKey) -> Result<RateLimitSnapshot, ApiError> {
        self.check_at(key, Instant::now())
    }

    /// Check and count a request from `key` at `now`.
    ///
    /// On rejection the error names the most restrictive exhausted tier,
    /// the one whose window resets last.
    #[instrument(level = "trace", skip_all, fields(client = %key))]
    pub fn check_at(&self, key: &ClientKey, now: Instant) -> Result<RateLimitSnapshot, ApiError> {
        match self.store.hit(key, &self.tiers, now) {
            Decision::Allowed(usage) => Ok(RateLimitSnapshot { usage }),
            Decision::Rejected(usage) => {
                let blocking = usage
                    .iter()
                    .filter(|u| u.is_exhausted())
                    .max_by_key(|u| u.reset_after)
                    .ok_or_else(|| {
                        ApiError::Internal(
                            "rate limiter rejected with no exhausted tier".to_string(),
                        )
                    })?;
                Err(ApiError::RateLimited {
                    tier: blocking.tier.name,
                    limit: blocking.tier.limit,
                    retry_after_secs: ceil_secs(blocking.reset_after),
                })
            }
        }
    }

    /// Drop expired windows. Returns the number of clients removed.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(&self.tiers, Instant::now())
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// Periodically purge expired rate-limit records.
pub fn spawn_sweeper(limiter: Arc<TieredRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.purge_expired();
            let tracked = limiter.store().tracked_clients();
            metrics::set_tracked_clients(tracked);
            debug!(removed, tracked, "Swept rate-limit records");
        }
    })
}
