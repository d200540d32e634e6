//! # Orchestrator: drives startup of the application model.
//!
//! [`OrchestratorBuilder`] collects resources and handler registrations;
//! [`Orchestrator::run`] walks the lifecycle against a [`WorkloadBackend`].
//!
//! ## Startup sequence
//! ```text
//! run(backend)
//!   ├─► pipeline.before_start()                 ─► BeforeStartEvent            (graph frozen)
//!   ├─► RelationshipEvaluator::evaluate(model)  ─► ChildLookup                 (cycles fail here)
//!   ├─► EndpointAllocator::allocate(model)
//!   ├─► pipeline.after_endpoints_allocated()    ─► AfterEndpointsAllocatedEvent
//!   ├─► backend.create(r)  for r in model
//!   ├─► pipeline.after_resources_created()      ─► AfterResourcesCreatedEvent
//!   ├─► for r in model:
//!   │      pipeline.before_resource_started(r)  ─► BeforeResourceStartedEvent  (scoped handlers match r)
//!   │      backend.start(r)
//!   └─► pipeline.mark_running()
//! ```
//!
//! The first error stops startup. Backend errors become
//! [`LifecycleError::Backend`], handler failures [`LifecycleError::Publish`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use apphost::{
//!     BeforeResourceStartedEvent, Config, EndpointAnnotation, NoopBackend, OrchestratorBuilder, Resource,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = OrchestratorBuilder::new(Config::default());
//!     let api = builder.add_resource(
//!         Resource::process("api").with_annotation(EndpointAnnotation::new("http", "http")),
//!     )?;
//!
//!     builder.eventing().subscribe_for(&api, |ev: Arc<BeforeResourceStartedEvent>, _ctx: CancellationToken| async move {
//!         println!("starting {}", ev.resource.name());
//!         Ok(())
//!     });
//!
//!     let orchestrator = builder.build();
//!     orchestrator.run(&NoopBackend).await?;
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use super::{EndpointAllocator, LifecyclePhase, LifecyclePipeline, Services, WorkloadBackend};
use crate::config::Config;
use crate::error::{BackendError, GraphError, LifecycleError};
use crate::events::EventBus;
use crate::relationships::{ChildLookup, RelationshipEvaluator};
use crate::resources::{Resource, ResourceGraph, ResourceRef};

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Arc<Config>,
    model: Arc<ResourceGraph>,
    services: Services,
}

impl OrchestratorBuilder {
    /// Creates a builder with an empty model.
    pub fn new(cfg: Config) -> Self {
        let cfg = Arc::new(cfg);
        let bus = Arc::new(EventBus::from_config(&cfg));
        Self {
            services: Services::new(bus, Arc::clone(&cfg)),
            model: Arc::new(ResourceGraph::new()),
            cfg,
        }
    }

    /// Registers a resource in the model.
    pub fn add_resource(&self, resource: Resource) -> Result<ResourceRef, GraphError> {
        self.model.add(resource)
    }

    /// The application model being built.
    pub fn model(&self) -> &Arc<ResourceGraph> {
        &self.model
    }

    /// Event bus for handler registration before the run.
    pub fn eventing(&self) -> &Arc<EventBus> {
        self.services.eventing()
    }

    /// Shared service context handed to lifecycle events.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        Orchestrator {
            pipeline: LifecyclePipeline::new(self.services, Arc::clone(&self.model)),
            allocator: EndpointAllocator::from_config(&self.cfg),
        }
    }
}

/// Runs the startup lifecycle of one application model.
#[derive(Debug)]
pub struct Orchestrator {
    pipeline: LifecyclePipeline,
    allocator: EndpointAllocator,
}

impl Orchestrator {
    /// Drives the model from `NotStarted` to `Running`.
    pub async fn run(&self, backend: &dyn WorkloadBackend) -> Result<(), LifecycleError> {
        let model = Arc::clone(self.pipeline.model());
        info!(resources = model.len(), "starting application");

        self.pipeline.before_start().await?;

        let lookup = RelationshipEvaluator::evaluate(&model)?;
        info!(roots = lookup.roots().len(), "relationships evaluated");

        let allocated = self.allocator.allocate(&model)?;
        info!(endpoints = allocated, "endpoints allocated");
        self.pipeline.after_endpoints_allocated().await?;

        let resources = model.resources();
        for r in &resources {
            backend.create(r).await.map_err(|error| backend_failure(r, error))?;
        }
        self.pipeline.after_resources_created().await?;

        for r in &resources {
            self.pipeline.before_resource_started(r).await?;
            backend.start(r).await.map_err(|error| backend_failure(r, error))?;
        }

        self.pipeline.mark_running()?;
        info!(resources = resources.len(), "application running");
        Ok(())
    }

    /// Parent/child lookup of the model as it is now.
    ///
    /// Parent annotations stay mutable after startup, so every call re-evaluates.
    pub fn relationships(&self) -> Result<ChildLookup, GraphError> {
        RelationshipEvaluator::evaluate(self.model())
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.pipeline.phase()
    }

    pub fn model(&self) -> &Arc<ResourceGraph> {
        self.pipeline.model()
    }

    pub fn services(&self) -> &Services {
        self.pipeline.services()
    }

    pub fn eventing(&self) -> &Arc<EventBus> {
        self.pipeline.services().eventing()
    }

    /// Cancels in-flight handlers and waits for background dispatches.
    pub async fn shutdown(&self) {
        info!("shutting down event bus");
        self.eventing().shutdown().await;
    }
}

fn backend_failure(resource: &ResourceRef, error: BackendError) -> LifecycleError {
    warn!(resource = resource.name(), error = %error, "backend failed");
    LifecycleError::Backend {
        resource: resource.name().to_string(),
        error,
    }
}
