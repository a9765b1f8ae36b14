//! HTTP API route definitions.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{health, parrot, parrot_raw, status, AppState};
use crate::ratelimit::{enforce_rate_limit, RateLimitLayerState};

/// Prefix for every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Build the CORS policy for the given allow-list.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}

/// Create the API router.
///
/// Layers, outermost first: tracing, CORS, rate limiter, body limit.
pub fn create_router(state: AppState) -> Router {
    let limiter = middleware::from_fn_with_state(
        RateLimitLayerState {
            limiter: state.limiter.clone(),
            trust_forwarded_for: state.trust_forwarded_for,
        },
        enforce_rate_limit,
    );

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/health/status", get(status));

    let parrot_routes = Router::new()
        .route("/parrot", post(parrot))
        .route("/parrot/raw", post(parrot_raw))
        .layer(DefaultBodyLimit::max(state.body_limit_bytes));

    let v1 = if state.rate_limit_health {
        health_routes.merge(parrot_routes).route_layer(limiter)
    } else {
        health_routes.merge(parrot_routes.route_layer(limiter))
    };

    Router::new()
        .nest(API_PREFIX, v1)
        .layer(cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Add an unthrottled `/metrics` route rendering Prometheus text.
pub fn with_metrics(router: Router, handle: PrometheusHandle) -> Router {
    router.route("/metrics", get(move || std::future::ready(handle.render())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::ratelimit::TieredRateLimiter;

    fn test_router(config: &Config) -> Router {
        let state = AppState::from_config(config, Arc::new(TieredRateLimiter::with_defaults()));
        create_router(state)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = test_router(&Config::default());

        let response = app.oneshot(get_request("/api/v1/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining-short"], "9");
    }

    #[tokio::test]
    async fn routes_live_under_prefix() {
        let app = test_router(&Config::default());

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_can_be_exempted_from_rate_limit() {
        let config = Config {
            rate_limit_health: false,
            ..Config::default()
        };
        let app = test_router(&config);

        for _ in 0..15 {
            let response = app
                .clone()
                .oneshot(get_request("/api/v1/health"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get("x-ratelimit-limit-short").is_none());
        }
    }

    #[tokio::test]
    async fn metrics_route_is_outside_api_prefix() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let app = with_metrics(test_router(&Config::default()), handle);

        let response = app.oneshot(get_request("/metrics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit-short").is_none());
    }
}
