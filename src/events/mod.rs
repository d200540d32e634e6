//! Typed events: trait, handlers and the in-process bus.
//!
//! This module groups the event **contract** and the **bus** that delivers
//! lifecycle notifications (and any user-defined events) to subscribers.
//!
//! ## Contents
//! - [`Event`], [`DispatchBehavior`] event contract and dispatch disciplines
//! - [`Handle`], [`HandlerFn`] struct-style and closure-style handlers
//! - [`EventBus`], [`Subscription`] registration and publish
//! - [`FailureChannel`] broadcast of failures from background dispatch
//!
//! ## Quick reference
//! - **Publishers**: `LifecyclePipeline` (lifecycle events), user code (custom events).
//! - **Consumers**: integrations registering handlers through `Services::eventing()`
//!   or `OrchestratorBuilder::eventing()`.

mod bus;
mod event;
mod failures;
mod handler;

pub use bus::{EventBus, Subscription};
pub use event::{DispatchBehavior, Event};
pub use failures::FailureChannel;
pub use handler::{Handle, HandlerFn};
