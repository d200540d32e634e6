//! # Event trait and dispatch disciplines.
//!
//! Any `Send + Sync + 'static` type can be published once it implements
//! [`Event`]. Events that concern a single resource return it from
//! [`Event::resource`]; resource-scoped subscriptions match on it by identity.
//!
//! ## Example
//! ```rust
//! use apphost::{Event, ResourceRef};
//!
//! struct ConfigReloaded;
//! impl Event for ConfigReloaded {}
//!
//! struct ResourceReady { resource: ResourceRef }
//! impl Event for ResourceReady {
//!     fn resource(&self) -> Option<&ResourceRef> { Some(&self.resource) }
//! }
//! ```

use std::any::Any;

use crate::resources::ResourceRef;

/// Publishable event.
pub trait Event: Any + Send + Sync {
    /// Resource this event concerns, if any.
    ///
    /// Default: `None` (only global subscribers match).
    fn resource(&self) -> Option<&ResourceRef> {
        None
    }
}

/// Short type name used in logs and failure records (`BeforeStartEvent`, not the full path).
pub(crate) fn event_name<E: Event>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// How a publish dispatches to its handlers.
///
/// | Discipline | Handlers | Caller waits |
/// |---|---|---|
/// | `BlockingSequential` | one at a time, registration order | until all complete |
/// | `BlockingConcurrent` | all started together | until all complete |
/// | `NonBlockingConcurrent` | all started together, in background | no |
/// | `NonBlockingSequential` | one at a time, registration order, in background | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchBehavior {
    #[default]
    BlockingSequential,
    BlockingConcurrent,
    NonBlockingConcurrent,
    NonBlockingSequential,
}

impl DispatchBehavior {
    /// True if the publisher waits for handler completion.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::BlockingSequential | Self::BlockingConcurrent)
    }

    /// True if handlers run one after another.
    pub fn is_sequential(self) -> bool {
        matches!(self, Self::BlockingSequential | Self::NonBlockingSequential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Event for Plain {}

    #[test]
    fn short_names() {
        assert_eq!(event_name::<Plain>(), "Plain");
    }

    #[test]
    fn discipline_flags() {
        assert!(DispatchBehavior::BlockingSequential.is_blocking());
        assert!(DispatchBehavior::BlockingSequential.is_sequential());
        assert!(DispatchBehavior::BlockingConcurrent.is_blocking());
        assert!(!DispatchBehavior::BlockingConcurrent.is_sequential());
        assert!(!DispatchBehavior::NonBlockingConcurrent.is_blocking());
        assert!(DispatchBehavior::NonBlockingSequential.is_sequential());
        assert!(!DispatchBehavior::NonBlockingSequential.is_blocking());
    }
}
