//! Ready-made lifecycle handlers.
//!
//! - [`LifecycleLogger`] logs every lifecycle event via `tracing`

mod log;

pub use log::LifecycleLogger;
