//! # Event handlers.
//!
//! [`Handle`] is the extension point for struct-style handlers; [`HandlerFn`]
//! wraps a closure `F: Fn(Arc<E>, CancellationToken) -> Fut`, producing a
//! fresh future per invocation.
//!
//! ## Rules
//! - A handler may suspend at any `.await`; the bus never assumes synchronous completion.
//! - Panics are caught by the bus and reported as [`HandlerError::Panicked`].
//! - The token is cancelled when the bus shuts down; long handlers should watch it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use apphost::{BeforeStartEvent, Handle, HandlerError};
//!
//! struct Banner;
//!
//! #[async_trait]
//! impl Handle<BeforeStartEvent> for Banner {
//!     async fn handle(&self, ev: Arc<BeforeStartEvent>, _ctx: CancellationToken) -> Result<(), HandlerError> {
//!         println!("starting {} resources", ev.model.len());
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "banner" }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Event;
use crate::error::HandlerError;

/// Handler for events of type `E`.
#[async_trait]
pub trait Handle<E: Event>: Send + Sync + 'static {
    /// Processes one event.
    async fn handle(&self, event: Arc<E>, ctx: CancellationToken) -> Result<(), HandlerError>;

    /// Handler name used in logs and failure records.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed handler.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<E, F, Fut> Handle<E> for HandlerFn<F>
where
    E: Event,
    F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: Arc<E>, ctx: CancellationToken) -> Result<(), HandlerError> {
        (self.f)(event, ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
