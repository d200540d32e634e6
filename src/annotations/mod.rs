//! Typed resource metadata.
//!
//! ## Contents
//! - [`Annotation`] marker trait for metadata types
//! - [`Annotations`] per-resource ordered store keyed by type tag
//! - [`AnnotationBehavior`] append/replace mutation policy
//! - well-known annotations: [`RelationshipAnnotation`], [`EndpointAnnotation`]

mod store;
mod well_known;

pub use store::{Annotation, AnnotationBehavior, Annotations};
pub use well_known::{AllocatedEndpoint, EndpointAnnotation, RelationshipAnnotation, PARENT_RELATIONSHIP};
