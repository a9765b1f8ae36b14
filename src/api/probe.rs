//! Downstream dependency checks reported by the API health endpoint.

use std::fmt::Debug;

use axum::async_trait;

/// A dependency the health endpoint reports on.
#[async_trait]
pub trait DependencyProbe: Send + Sync + Debug {
    /// Round-trip to the dependency, returning a reason when it is unreachable.
    async fn check(&self) -> Result<(), String>;
}

/// Probe for a dependency that is not wired up yet; always reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

#[async_trait]
impl DependencyProbe for NoopProbe {
    async fn check(&self) -> Result<(), String> {
        Ok(())
    }
}
