//! # Workload backend seam.
//!
//! The orchestrator core does not know how to run containers or processes.
//! A [`WorkloadBackend`] does: it is called once to create and once to start
//! each resource, in graph registration order.

use async_trait::async_trait;
use tracing::debug;

use crate::error::BackendError;
use crate::resources::ResourceRef;

/// Container/process runtime driven by the orchestrator.
#[async_trait]
pub trait WorkloadBackend: Send + Sync {
    /// Creates the workload for `resource` without starting it.
    async fn create(&self, resource: &ResourceRef) -> Result<(), BackendError>;

    /// Starts a previously created workload.
    async fn start(&self, resource: &ResourceRef) -> Result<(), BackendError>;
}

/// Backend that only logs. Useful for dry runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

#[async_trait]
impl WorkloadBackend for NoopBackend {
    async fn create(&self, resource: &ResourceRef) -> Result<(), BackendError> {
        debug!(resource = resource.name(), "noop create");
        Ok(())
    }

    async fn start(&self, resource: &ResourceRef) -> Result<(), BackendError> {
        debug!(resource = resource.name(), "noop start");
        Ok(())
    }
}
