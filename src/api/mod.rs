//! HTTP API service: health reports and the parrot echo endpoints.

pub mod handlers;
pub mod probe;
pub mod routes;
pub mod validation;

pub use handlers::AppState;
pub use probe::{DependencyProbe, NoopProbe};
pub use routes::{create_router, with_metrics, API_PREFIX};
pub use validation::{RawJson, ValidatedJson};
