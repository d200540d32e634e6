//! # Example: startup
//!
//! Declares a small application and drives it to `Running` against a
//! logging-only backend.
//!
//! Shows how to:
//! - Declare resources with structural and annotation-declared parents.
//! - Attach endpoints and read their allocated addresses.
//! - Register global and resource-scoped lifecycle handlers.
//! - Observe background handler failures.
//!
//! ## Flow
//! ```text
//! OrchestratorBuilder
//!     ├─► add_resource(db, cache, api ─parent─► db, worker ─annotation─► api)
//!     ├─► LifecycleLogger::attach(bus)
//!     └─► build() ─► Orchestrator::run(&LoggingBackend)
//!           ├─► BeforeStartEvent
//!           ├─► AfterEndpointsAllocatedEvent   (print URLs)
//!           ├─► AfterResourcesCreatedEvent
//!           └─► BeforeResourceStartedEvent × 4 (scoped handler on api)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example startup
//! ```

use std::sync::Arc;

use apphost::{
    AfterEndpointsAllocatedEvent, BackendError, BeforeResourceStartedEvent, Config, DispatchBehavior,
    EndpointAnnotation, Event, HandlerError, LifecycleLogger, OrchestratorBuilder, RelationshipAnnotation,
    Resource, ResourceRef, WorkloadBackend,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Backend that only prints what it would do.
struct LoggingBackend;

#[async_trait]
impl WorkloadBackend for LoggingBackend {
    async fn create(&self, r: &ResourceRef) -> Result<(), BackendError> {
        println!("[backend] create {} ({:?})", r.name(), r.kind());
        Ok(())
    }

    async fn start(&self, r: &ResourceRef) -> Result<(), BackendError> {
        println!("[backend] start  {}", r.name());
        Ok(())
    }
}

/// Custom event published after startup.
struct Warmup;
impl Event for Warmup {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    apphost::init_tracing();

    let builder = OrchestratorBuilder::new(Config::default());
    let db = builder.add_resource(
        Resource::container("db").with_annotation(EndpointAnnotation::new("tcp", "tcp").with_target_port(5432)),
    )?;
    builder.add_resource(Resource::container("cache").with_annotation(EndpointAnnotation::new("tcp", "tcp")))?;
    let api = builder.add_resource(
        Resource::process("api")
            .with_parent(&db)
            .with_annotation(EndpointAnnotation::new("http", "http").with_port(8080)),
    )?;
    let worker = builder.add_resource(Resource::process("worker"))?;
    worker.annotate_default(RelationshipAnnotation::parent(&api))?;

    let bus = Arc::clone(builder.eventing());
    LifecycleLogger::attach(&bus);

    bus.subscribe(|ev: Arc<AfterEndpointsAllocatedEvent>, _ctx: CancellationToken| async move {
        for r in ev.model.resources() {
            for ep in r.annotations::<EndpointAnnotation>() {
                if let Some(addr) = ep.allocated() {
                    println!("[endpoints] {}/{} -> {}", r.name(), ep.name(), addr.url());
                }
            }
        }
        Ok(())
    });

    bus.subscribe_for(&api, |ev: Arc<BeforeResourceStartedEvent>, _ctx: CancellationToken| async move {
        println!("[api] about to start {}", ev.resource.name());
        Ok(())
    });

    bus.subscribe(|_: Arc<Warmup>, _ctx: CancellationToken| async {
        Err(HandlerError::failed("cache not warm yet"))
    });

    let app = builder.build();
    app.run(&LoggingBackend).await?;

    if let Ok(lookup) = app.relationships() {
        for (parent, children) in lookup.iter() {
            let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
            println!("[graph] {} -> {:?}", parent.name(), names);
        }
    }

    let mut failures = bus.failures();
    bus.publish(Warmup, DispatchBehavior::NonBlockingConcurrent).await?;
    if let Ok(failure) = failures.recv().await {
        println!("[failures] {failure}");
    }

    app.shutdown().await;
    Ok(())
}
