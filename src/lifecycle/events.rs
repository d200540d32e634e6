//! # Lifecycle events.
//!
//! Published by the [`LifecyclePipeline`](super::LifecyclePipeline) in this order:
//!
//! | Event | When | Payload |
//! |---|---|---|
//! | [`BeforeStartEvent`] | once, before anything is created | services, model |
//! | [`AfterEndpointsAllocatedEvent`] | once, after endpoint allocation | services, model |
//! | [`AfterResourcesCreatedEvent`] | once, after every resource is created | services, model |
//! | [`BeforeResourceStartedEvent`] | once per resource, before it starts | resource, services |
//!
//! Only [`BeforeResourceStartedEvent`] carries a resource, so it is the only
//! lifecycle event that resource-scoped subscriptions can match.

use std::sync::Arc;

use super::Services;
use crate::events::Event;
use crate::resources::{ResourceGraph, ResourceRef};

/// Published before the application starts. The graph is already frozen.
#[derive(Debug, Clone)]
pub struct BeforeStartEvent {
    pub services: Services,
    pub model: Arc<ResourceGraph>,
}

impl Event for BeforeStartEvent {}

/// Published once every endpoint has a concrete host and port.
#[derive(Debug, Clone)]
pub struct AfterEndpointsAllocatedEvent {
    pub services: Services,
    pub model: Arc<ResourceGraph>,
}

impl Event for AfterEndpointsAllocatedEvent {}

/// Published once the backend has created every resource.
#[derive(Debug, Clone)]
pub struct AfterResourcesCreatedEvent {
    pub services: Services,
    pub model: Arc<ResourceGraph>,
}

impl Event for AfterResourcesCreatedEvent {}

/// Published right before a single resource is started.
#[derive(Debug, Clone)]
pub struct BeforeResourceStartedEvent {
    pub resource: ResourceRef,
    pub services: Services,
}

impl Event for BeforeResourceStartedEvent {
    fn resource(&self) -> Option<&ResourceRef> {
        Some(&self.resource)
    }
}
