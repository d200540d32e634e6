//! # Lifecycle pipeline.
//!
//! [`LifecyclePipeline`] owns the phase machine and publishes one lifecycle
//! event per transition on the shared [`EventBus`](crate::EventBus), using
//! [`Config::default_dispatch`](crate::Config::default_dispatch).
//!
//! ## Rules
//! - Phases only move forward; a call from the wrong phase is
//!   [`LifecycleError::OutOfOrder`] and publishes nothing.
//! - The phase advances **before** the event is published, so handlers observe
//!   the new phase and a second concurrent call is rejected.
//! - `before_resource_started` is accepted once per resource, only in
//!   [`LifecyclePhase::ResourcesCreated`].
//! - No lock is held across an `.await`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use super::{
    AfterEndpointsAllocatedEvent, AfterResourcesCreatedEvent, BeforeResourceStartedEvent, BeforeStartEvent,
    LifecyclePhase, Services,
};
use crate::error::LifecycleError;
use crate::events::Event;
use crate::resources::{ResourceGraph, ResourceRef};

/// Publishes lifecycle events in order.
#[derive(Debug)]
pub struct LifecyclePipeline {
    services: Services,
    model: Arc<ResourceGraph>,
    phase: Mutex<LifecyclePhase>,
    started: Mutex<HashSet<Arc<str>>>,
}

impl LifecyclePipeline {
    pub fn new(services: Services, model: Arc<ResourceGraph>) -> Self {
        Self {
            services,
            model,
            phase: Mutex::new(LifecyclePhase::NotStarted),
            started: Mutex::new(HashSet::new()),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn model(&self) -> &Arc<ResourceGraph> {
        &self.model
    }

    /// Freezes the graph (if configured) and publishes [`BeforeStartEvent`].
    pub async fn before_start(&self) -> Result<(), LifecycleError> {
        self.advance(LifecyclePhase::NotStarted, LifecyclePhase::BeforeStart)?;
        if self.services.config().freeze_on_start {
            self.model.freeze();
        }
        self.publish(BeforeStartEvent {
            services: self.services.clone(),
            model: Arc::clone(&self.model),
        })
        .await
    }

    /// Publishes [`AfterEndpointsAllocatedEvent`].
    pub async fn after_endpoints_allocated(&self) -> Result<(), LifecycleError> {
        self.advance(LifecyclePhase::BeforeStart, LifecyclePhase::EndpointsAllocated)?;
        self.publish(AfterEndpointsAllocatedEvent {
            services: self.services.clone(),
            model: Arc::clone(&self.model),
        })
        .await
    }

    /// Publishes [`AfterResourcesCreatedEvent`].
    pub async fn after_resources_created(&self) -> Result<(), LifecycleError> {
        self.advance(LifecyclePhase::EndpointsAllocated, LifecyclePhase::ResourcesCreated)?;
        self.publish(AfterResourcesCreatedEvent {
            services: self.services.clone(),
            model: Arc::clone(&self.model),
        })
        .await
    }

    /// Publishes [`BeforeResourceStartedEvent`] for one resource of the model.
    pub async fn before_resource_started(&self, resource: &ResourceRef) -> Result<(), LifecycleError> {
        let actual = self.phase();
        if actual != LifecyclePhase::ResourcesCreated {
            return Err(LifecycleError::OutOfOrder {
                expected: LifecyclePhase::ResourcesCreated,
                actual,
            });
        }
        if !self.model.contains(resource) {
            return Err(LifecycleError::UnknownResource {
                name: resource.name().to_string(),
            });
        }
        let fresh = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::from(resource.name()));
        if !fresh {
            return Err(LifecycleError::AlreadyStarted {
                name: resource.name().to_string(),
            });
        }

        info!(resource = resource.name(), "starting resource");
        self.publish(BeforeResourceStartedEvent {
            resource: Arc::clone(resource),
            services: self.services.clone(),
        })
        .await
    }

    /// Marks startup complete.
    pub fn mark_running(&self) -> Result<(), LifecycleError> {
        self.advance(LifecyclePhase::ResourcesCreated, LifecyclePhase::Running)
    }

    fn advance(&self, from: LifecyclePhase, to: LifecyclePhase) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != from {
            return Err(LifecycleError::OutOfOrder {
                expected: from,
                actual: *phase,
            });
        }
        *phase = to;
        drop(phase);
        info!(phase = %to, resources = self.model.len(), "lifecycle phase entered");
        Ok(())
    }

    async fn publish<E: Event>(&self, event: E) -> Result<(), LifecycleError> {
        let behavior = self.services.config().default_dispatch;
        self.services.eventing().publish(event, behavior).await?;
        Ok(())
    }
}
