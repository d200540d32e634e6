//! Startup lifecycle: phases, events, and the orchestrator that drives them.
//!
//! - [`LifecyclePhase`] linear phase machine
//! - [`BeforeStartEvent`], [`AfterEndpointsAllocatedEvent`], [`AfterResourcesCreatedEvent`],
//!   [`BeforeResourceStartedEvent`] lifecycle notifications
//! - [`Services`] shared context carried by every lifecycle event
//! - [`LifecyclePipeline`] phase checks + publishing
//! - [`EndpointAllocator`] host/port assignment for endpoint annotations
//! - [`WorkloadBackend`] seam to the container/process runtime
//! - [`Orchestrator`], [`OrchestratorBuilder`] end-to-end startup

mod backend;
mod endpoints;
mod events;
mod orchestrator;
mod phase;
mod pipeline;
mod services;

pub use backend::{NoopBackend, WorkloadBackend};
pub use endpoints::EndpointAllocator;
pub use events::{
    AfterEndpointsAllocatedEvent, AfterResourcesCreatedEvent, BeforeResourceStartedEvent, BeforeStartEvent,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use phase::LifecyclePhase;
pub use pipeline::LifecyclePipeline;
pub use services::Services;
