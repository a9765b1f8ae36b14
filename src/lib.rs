//! Echo API and web health services.
//!
//! Two small HTTP services built on axum:
//!
//! ```text
//! API (/api/v1)                          Web
//! ─────────────                          ───
//! request                                request
//!   → trace → CORS                         → trace
//!   → tiered rate limiter                  → GET/HEAD /api/health
//!   → body limit + JSON validation
//!   → /health, /health/status,
//!     /parrot, /parrot/raw
//! ```
//!
//! The rate limiter enforces three fixed-window tiers per client at once:
//! 10 requests per minute, 50 per five minutes, 100 per hour.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`ratelimit`]: Tiered rate limiting and its middleware
//! - [`api`]: API service handlers and routes
//! - [`web`]: Web service health route
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Timestamps and shutdown signal

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ratelimit;
pub mod utils;
pub mod web;

pub use config::Config;
pub use error::{ApiError, Result, ServiceError};
