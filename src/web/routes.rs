//! Web service route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, health_head, WebState};

/// Health route path.
pub const HEALTH_PATH: &str = "/api/health";

/// Create the web service router.
pub fn create_router(state: WebState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health).head(health_head))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
