use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::HandlerError;
use crate::events::{EventBus, Handle, Subscription};
use crate::lifecycle::{
    AfterEndpointsAllocatedEvent, AfterResourcesCreatedEvent, BeforeResourceStartedEvent, BeforeStartEvent,
};

/// Logs every lifecycle event through `tracing`.
///
/// Useful for demos and debugging. Attach it before the run:
/// `LifecycleLogger::attach(builder.eventing())`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleLogger;

impl LifecycleLogger {
    /// Subscribes a logger to all four lifecycle events.
    pub fn attach(bus: &EventBus) -> Vec<Subscription> {
        let logger = Arc::new(LifecycleLogger);
        vec![
            bus.subscribe_handler::<BeforeStartEvent>(logger.clone()),
            bus.subscribe_handler::<AfterEndpointsAllocatedEvent>(logger.clone()),
            bus.subscribe_handler::<AfterResourcesCreatedEvent>(logger.clone()),
            bus.subscribe_handler::<BeforeResourceStartedEvent>(logger),
        ]
    }
}

#[async_trait]
impl Handle<BeforeStartEvent> for LifecycleLogger {
    async fn handle(&self, e: Arc<BeforeStartEvent>, _ctx: CancellationToken) -> Result<(), HandlerError> {
        info!(resources = e.model.len(), frozen = e.model.is_frozen(), "[before-start]");
        Ok(())
    }

    fn name(&self) -> &str {
        "lifecycle-logger"
    }
}

#[async_trait]
impl Handle<AfterEndpointsAllocatedEvent> for LifecycleLogger {
    async fn handle(&self, e: Arc<AfterEndpointsAllocatedEvent>, _ctx: CancellationToken) -> Result<(), HandlerError> {
        info!(resources = e.model.len(), "[endpoints-allocated]");
        Ok(())
    }

    fn name(&self) -> &str {
        "lifecycle-logger"
    }
}

#[async_trait]
impl Handle<AfterResourcesCreatedEvent> for LifecycleLogger {
    async fn handle(&self, e: Arc<AfterResourcesCreatedEvent>, _ctx: CancellationToken) -> Result<(), HandlerError> {
        info!(resources = e.model.len(), "[resources-created]");
        Ok(())
    }

    fn name(&self) -> &str {
        "lifecycle-logger"
    }
}

#[async_trait]
impl Handle<BeforeResourceStartedEvent> for LifecycleLogger {
    async fn handle(&self, e: Arc<BeforeResourceStartedEvent>, _ctx: CancellationToken) -> Result<(), HandlerError> {
        info!(resource = e.resource.name(), kind = ?e.resource.kind(), "[resource-starting]");
        Ok(())
    }

    fn name(&self) -> &str {
        "lifecycle-logger"
    }
}
