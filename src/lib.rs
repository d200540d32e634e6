//! # apphost
//!
//! **apphost** is the core of a local distributed-application orchestrator.
//!
//! It models an application as a graph of named resources decorated with
//! typed annotations, derives parent/child relationships from that graph,
//! and drives a startup lifecycle that notifies integrations through a typed
//! in-process event bus. Running containers or processes is left to a
//! [`WorkloadBackend`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Resource   │   │   Resource   │   │   Resource   │
//!     │ + Annotations│   │ + Annotations│   │ + Annotations│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ResourceGraph (application model)                                │
//! │  - unique names, registration order                               │
//! │  - structural parents (Weak back-pointers)                        │
//! │  - frozen at BeforeStart                                          │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        ▼                                                  ▼
//! ┌──────────────────────────┐          ┌──────────────────────────────┐
//! │  RelationshipEvaluator   │          │  Orchestrator::run(backend)  │
//! │  structural parent, else │          │  LifecyclePipeline           │
//! │  last "Parent" annotation│          │  EndpointAllocator           │
//! │  ─► ChildLookup          │          │  WorkloadBackend             │
//! └──────────────────────────┘          └──────────────┬───────────────┘
//!                                                      │ publish(lifecycle event)
//!                                                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      EventBus (typed handlers)                    │
//! │   global + resource-scoped subscriptions, 4 dispatch behaviors    │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               ▼
//!    handler 1          handler 2          handler N     FailureChannel
//!                                                      (non-blocking failures)
//! ```
//!
//! ### Lifecycle
//! ```text
//! NotStarted
//!   ├─► BeforeStartEvent                 (graph frozen, cycles checked)
//!   ├─► endpoints allocated
//!   ├─► AfterEndpointsAllocatedEvent
//!   ├─► backend.create(r) for every r
//!   ├─► AfterResourcesCreatedEvent
//!   ├─► for r: BeforeResourceStartedEvent{r} ─► backend.start(r)
//!   └─► Running
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                            |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------|
//! | **Annotations**   | Typed, heterogeneous metadata attached to resources.          | [`Annotation`], [`Annotations`]               |
//! | **Resources**     | Named nodes of the application model.                         | [`Resource`], [`ResourceGraph`]               |
//! | **Relationships** | Parent/child edges from structure and annotations.            | [`RelationshipEvaluator`], [`ChildLookup`]    |
//! | **Eventing**      | Typed pub/sub with four dispatch behaviors.                   | [`EventBus`], [`Handle`], [`DispatchBehavior`]|
//! | **Lifecycle**     | Ordered startup notifications and the orchestrator.           | [`Orchestrator`], [`LifecyclePipeline`]       |
//! | **Errors**        | Typed errors for graph, handlers, publish, and lifecycle.     | [`GraphError`], [`LifecycleError`]            |
//! | **Configuration** | Centralized runtime settings.                                 | [`Config`]                                    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use apphost::{BeforeStartEvent, Config, NoopBackend, OrchestratorBuilder, Resource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = OrchestratorBuilder::new(Config::default());
//!     let db = builder.add_resource(Resource::container("db"))?;
//!     builder.add_resource(Resource::process("api").with_parent(&db))?;
//!
//!     builder.eventing().subscribe(|ev: Arc<BeforeStartEvent>, _ctx: CancellationToken| async move {
//!         println!("starting {} resources", ev.model.len());
//!         Ok(())
//!     });
//!
//!     let app = builder.build();
//!     app.run(&NoopBackend).await?;
//!     assert_eq!(app.relationships().unwrap().children_of(&db).len(), 1);
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```
mod annotations;
mod config;
mod error;
mod events;
mod lifecycle;
mod observers;
mod relationships;
mod resources;
mod telemetry;

// ---- Public re-exports ----

pub use annotations::{
    AllocatedEndpoint, Annotation, AnnotationBehavior, Annotations, EndpointAnnotation, RelationshipAnnotation,
    PARENT_RELATIONSHIP,
};
pub use config::Config;
pub use error::{BackendError, GraphError, HandlerError, HandlerFailure, LifecycleError, PublishError};
pub use events::{DispatchBehavior, Event, EventBus, FailureChannel, Handle, HandlerFn, Subscription};
pub use lifecycle::{
    AfterEndpointsAllocatedEvent, AfterResourcesCreatedEvent, BeforeResourceStartedEvent, BeforeStartEvent,
    EndpointAllocator, LifecyclePhase, LifecyclePipeline, NoopBackend, Orchestrator, OrchestratorBuilder, Services,
    WorkloadBackend,
};
pub use observers::LifecycleLogger;
pub use relationships::{ChildLookup, RelationshipEvaluator};
pub use resources::{Resource, ResourceGraph, ResourceKind, ResourceRef};
pub use telemetry::init_tracing;
