//! Resources and the resource graph.
//!
//! - [`Resource`] / [`ResourceRef`] a named node with annotations and an optional parent
//! - [`ResourceGraph`] the application model owning all resources

mod graph;
mod resource;

pub use graph::ResourceGraph;
pub use resource::{Resource, ResourceKind, ResourceRef};
