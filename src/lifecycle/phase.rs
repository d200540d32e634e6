//! # Lifecycle phases.
//!
//! Startup is a linear machine. There are no backward transitions:
//!
//! ```text
//! NotStarted ─► BeforeStart ─► EndpointsAllocated ─► ResourcesCreated ─► Running
//!                                                      │
//!                                                      └─ BeforeResourceStarted (once per resource)
//! ```

use std::fmt;

/// Where the pipeline is in startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LifecyclePhase {
    /// Nothing published yet; the graph is still mutable.
    #[default]
    NotStarted,
    /// `BeforeStartEvent` was published; the graph is frozen.
    BeforeStart,
    /// Endpoints were allocated and `AfterEndpointsAllocatedEvent` published.
    EndpointsAllocated,
    /// All resources were created; per-resource start notifications are allowed.
    ResourcesCreated,
    /// Startup completed.
    Running,
}

impl LifecyclePhase {
    /// Phase that must precede `self`, or `None` for the initial phase.
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::NotStarted => None,
            Self::BeforeStart => Some(Self::NotStarted),
            Self::EndpointsAllocated => Some(Self::BeforeStart),
            Self::ResourcesCreated => Some(Self::EndpointsAllocated),
            Self::Running => Some(Self::ResourcesCreated),
        }
    }

    /// Stable snake_case label.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::BeforeStart => "before_start",
            Self::EndpointsAllocated => "endpoints_allocated",
            Self::ResourcesCreated => "resources_created",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
