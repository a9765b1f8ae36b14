//! Web service: a single health-check route.

pub mod handlers;
pub mod routes;

pub use handlers::WebState;
pub use routes::{create_router, HEALTH_PATH};
