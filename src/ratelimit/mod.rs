//! Tiered fixed-window rate limiting.
//!
//! This module handles:
//! - The static tier table (short / medium / long)
//! - Client identification from the inbound request
//! - Per-client counters behind a swappable store
//! - The axum middleware that rejects over-limit requests

pub mod key;
pub mod limiter;
pub mod middleware;
pub mod store;
pub mod tier;

pub use key::ClientKey;
pub use limiter::{spawn_sweeper, RateLimitSnapshot, TieredRateLimiter};
pub use middleware::{enforce_rate_limit, RateLimitLayerState};
pub use store::{CounterStore, Decision, InMemoryStore, TierUsage, WindowRecord};
pub use tier::{Tier, TierName};
