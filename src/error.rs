//! Error types used by the apphost core.
//!
//! - [`GraphError`] precondition violations raised while building or evaluating the resource graph.
//! - [`HandlerError`] failures raised by individual event handlers.
//! - [`PublishError`] aggregated handler failures surfaced by blocking publishes.
//! - [`BackendError`] failures reported by the workload backend.
//! - [`LifecycleError`] failures of the startup pipeline.
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).

use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::LifecyclePhase;

/// # Errors produced while building or evaluating the resource graph.
///
/// These are caller programming errors and are reported synchronously at the
/// call that introduced them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Resource name is empty or whitespace only.
    #[error("resource name must not be empty")]
    EmptyName,

    /// A resource with the same name is already registered.
    #[error("resource '{name}' is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// Resource declares itself as its own parent.
    #[error("resource '{name}' cannot be its own parent")]
    SelfParent {
        /// The offending resource.
        name: String,
    },

    /// Parent reference points outside of the graph (unregistered or dropped).
    #[error("parent '{parent}' of resource '{child}' is not part of the graph")]
    UnknownParent {
        /// Child resource name.
        child: String,
        /// Parent resource name (`<dropped>` if the parent no longer exists).
        parent: String,
    },

    /// Graph topology is frozen; no resources can be added.
    #[error("cannot add resource '{name}': graph is frozen")]
    Frozen {
        /// Name of the rejected resource.
        name: String,
    },

    /// Parent chain loops back on itself.
    #[error("parent cycle detected: {}", .path.join(" -> "))]
    ParentCycle {
        /// Resource names along the cycle, first element repeated at the end.
        path: Vec<String>,
    },
}

impl GraphError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use apphost::GraphError;
    ///
    /// let err = GraphError::DuplicateName { name: "api".into() };
    /// assert_eq!(err.as_label(), "graph_duplicate_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GraphError::EmptyName => "graph_empty_name",
            GraphError::DuplicateName { .. } => "graph_duplicate_name",
            GraphError::SelfParent { .. } => "graph_self_parent",
            GraphError::UnknownParent { .. } => "graph_unknown_parent",
            GraphError::Frozen { .. } => "graph_frozen",
            GraphError::ParentCycle { .. } => "graph_parent_cycle",
        }
    }
}

/// # Errors produced by event handlers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler returned an error.
    #[error("handler failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; the panic was caught by the bus.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Handler observed cancellation and gave up.
    #[error("handler cancelled")]
    Canceled,
}

impl HandlerError {
    /// Convenience constructor for [`HandlerError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        HandlerError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Canceled => "handler_canceled",
        }
    }
}

/// One failed handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Event type name.
    pub event: &'static str,
    /// Handler name.
    pub handler: Arc<str>,
    /// What went wrong.
    pub error: HandlerError,
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.handler, self.event, self.error)
    }
}

/// # Errors returned by blocking publishes.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// One or more handlers failed. Every failure is kept, in registration order.
    #[error("{} handler(s) failed for {event}: {}", .failures.len(), render(.failures))]
    Handlers {
        /// Event type name.
        event: &'static str,
        /// All handler failures of this publish.
        failures: Vec<HandlerFailure>,
    },
}

fn render(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Handlers { .. } => "publish_handlers_failed",
        }
    }

    /// All handler failures carried by this error.
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            PublishError::Handlers { failures, .. } => failures,
        }
    }
}

/// # Errors reported by a [`WorkloadBackend`](crate::WorkloadBackend).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend could not create or start the workload.
    #[error("backend failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Backend is not reachable.
    #[error("backend unavailable")]
    Unavailable,
}

/// # Errors produced by the lifecycle pipeline.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A lifecycle step was requested from the wrong phase.
    #[error("lifecycle step requires phase {expected:?}, current phase is {actual:?}")]
    OutOfOrder {
        /// Phase the step requires.
        expected: LifecyclePhase,
        /// Phase the pipeline is in.
        actual: LifecyclePhase,
    },

    /// `BeforeResourceStarted` was already published for this resource.
    #[error("resource '{name}' was already started")]
    AlreadyStarted {
        /// Resource name.
        name: String,
    },

    /// Resource does not belong to the pipeline's graph.
    #[error("resource '{name}' is not part of the application model")]
    UnknownResource {
        /// Resource name.
        name: String,
    },

    /// A blocking publish surfaced handler failures.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Graph evaluation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Workload backend failed for a resource.
    #[error("backend failed for resource '{resource}': {error}")]
    Backend {
        /// Resource name.
        resource: String,
        /// Backend error.
        #[source]
        error: BackendError,
    },

    /// An endpoint could not be allocated.
    #[error("cannot allocate endpoint '{endpoint}' of resource '{resource}': {reason}")]
    EndpointAllocation {
        /// Resource name.
        resource: String,
        /// Endpoint name.
        endpoint: String,
        /// Why allocation failed.
        reason: String,
    },
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::OutOfOrder { .. } => "lifecycle_out_of_order",
            LifecycleError::AlreadyStarted { .. } => "lifecycle_already_started",
            LifecycleError::UnknownResource { .. } => "lifecycle_unknown_resource",
            LifecycleError::Publish(e) => e.as_label(),
            LifecycleError::Graph(e) => e.as_label(),
            LifecycleError::Backend { .. } => "lifecycle_backend_failed",
            LifecycleError::EndpointAllocation { .. } => "lifecycle_endpoint_allocation",
        }
    }
}
