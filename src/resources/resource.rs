//! # Resource: a named node of the application graph.
//!
//! A [`Resource`] has an immutable identity (name + kind), an optional
//! structural parent and an interior-mutable annotation store. Resources are
//! shared as [`ResourceRef`] (`Arc<Resource>`); identity is pointer identity.
//!
//! ## Parent resolution
//! ```text
//! parent_of(r):
//!   1. structural parent   (Resource::with_parent)          ─► use it
//!   2. last RelationshipAnnotation with kind "Parent"       ─► use it
//!   3. none
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::annotations::{Annotation, AnnotationBehavior, Annotations, RelationshipAnnotation};
use crate::error::GraphError;

/// Shared handle to a resource.
pub type ResourceRef = Arc<Resource>;

/// What kind of workload backs a resource. Descriptive only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Local executable.
    Process,
    /// Container image.
    Container,
    /// Placeholder for an external or cloud resource.
    Placeholder,
    /// Anything else.
    Custom(Arc<str>),
}

/// Named node of the application graph.
pub struct Resource {
    name: Arc<str>,
    kind: ResourceKind,
    parent: Option<Weak<Resource>>,
    annotations: RwLock<Annotations>,
}

impl Resource {
    /// Creates a resource without parent and annotations.
    pub fn new(name: impl Into<Arc<str>>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            annotations: RwLock::new(Annotations::new()),
        }
    }

    pub fn process(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ResourceKind::Process)
    }

    pub fn container(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ResourceKind::Container)
    }

    pub fn placeholder(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ResourceKind::Placeholder)
    }

    /// Declares a structural parent. Takes priority over parent annotations.
    pub fn with_parent(mut self, parent: &ResourceRef) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    /// Appends an annotation before the resource is registered.
    pub fn with_annotation<T: Annotation>(mut self, annotation: T) -> Self {
        self.annotations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .add(annotation, AnnotationBehavior::Append);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// True if the resource type declares its parent structurally.
    pub fn has_structural_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Resolved parent, if any (see module docs for the priority).
    pub fn parent(&self) -> Option<ResourceRef> {
        self.parent_link().and_then(|w| w.upgrade())
    }

    /// Parent back-pointer as declared, even if the target was dropped.
    pub(crate) fn parent_link(&self) -> Option<Weak<Resource>> {
        if let Some(p) = &self.parent {
            return Some(p.clone());
        }
        self.read()
            .of_type::<RelationshipAnnotation>()
            .iter()
            .rev()
            .find(|rel| rel.is_parent())
            .map(|rel| rel.target().clone())
    }

    /// Adds an annotation with the given mutation behavior.
    ///
    /// Fails only when a parent relationship points at the resource itself.
    pub fn annotate<T: Annotation>(
        &self,
        annotation: T,
        behavior: AnnotationBehavior,
    ) -> Result<Arc<T>, GraphError> {
        let any: &dyn std::any::Any = &annotation;
        if let Some(rel) = any.downcast_ref::<RelationshipAnnotation>() {
            if rel.is_parent() && std::ptr::eq(rel.target().as_ptr(), self) {
                return Err(GraphError::SelfParent {
                    name: self.name.to_string(),
                });
            }
        }
        Ok(self.write().add(annotation, behavior))
    }

    /// Shorthand for [`annotate`](Self::annotate) with [`AnnotationBehavior::Append`].
    pub fn annotate_default<T: Annotation>(&self, annotation: T) -> Result<Arc<T>, GraphError> {
        self.annotate(annotation, AnnotationBehavior::Append)
    }

    /// Declares `parent` through a [`RelationshipAnnotation`].
    pub fn set_parent(&self, parent: &ResourceRef) -> Result<(), GraphError> {
        self.annotate_default(RelationshipAnnotation::parent(parent))
            .map(|_| ())
    }

    /// Annotations of type `T` in insertion order.
    pub fn annotations<T: Annotation>(&self) -> Vec<Arc<T>> {
        self.read().of_type::<T>()
    }

    /// Most recent annotation of type `T`.
    pub fn last_annotation<T: Annotation>(&self) -> Option<Arc<T>> {
        self.read().last::<T>()
    }

    /// Snapshot of the whole annotation store.
    pub fn annotation_snapshot(&self) -> Annotations {
        self.read().clone()
    }

    /// Identity comparison.
    pub fn is(&self, other: &Resource) -> bool {
        std::ptr::eq(self, other)
    }

    fn read(&self) -> RwLockReadGuard<'_, Annotations> {
        self.annotations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Annotations> {
        self.annotations.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.parent().map(|p| p.name.clone());
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &parent)
            .field("annotations", &*self.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::EndpointAnnotation;

    #[test]
    fn structural_parent_wins_over_annotation() {
        let a = Arc::new(Resource::process("a"));
        let b = Arc::new(Resource::process("b"));
        let child = Arc::new(Resource::process("child").with_parent(&a));
        child.set_parent(&b).unwrap();

        assert!(Arc::ptr_eq(&child.parent().unwrap(), &a));
    }

    #[test]
    fn latest_parent_annotation_wins() {
        let a = Arc::new(Resource::process("a"));
        let b = Arc::new(Resource::process("b"));
        let child = Arc::new(Resource::process("child"));
        child.set_parent(&a).unwrap();
        child.set_parent(&b).unwrap();
        child
            .annotate_default(RelationshipAnnotation::new(&a, "Reference"))
            .unwrap();

        assert!(Arc::ptr_eq(&child.parent().unwrap(), &b));
    }

    #[test]
    fn self_parent_annotation_is_rejected() {
        let r = Arc::new(Resource::container("redis"));
        let err = r.set_parent(&r).unwrap_err();
        assert_eq!(err, GraphError::SelfParent { name: "redis".into() });
        assert!(r.annotations::<RelationshipAnnotation>().is_empty());
    }

    #[test]
    fn annotate_is_visible_immediately() {
        let r = Resource::process("api").with_annotation(EndpointAnnotation::new("http", "http"));
        let r = Arc::new(r);
        r.annotate(EndpointAnnotation::new("https", "https"), AnnotationBehavior::Append)
            .unwrap();
        let eps = r.annotations::<EndpointAnnotation>();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[1].name(), "https");

        r.annotate(EndpointAnnotation::new("grpc", "http2"), AnnotationBehavior::Replace)
            .unwrap();
        let eps = r.annotations::<EndpointAnnotation>();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].name(), "grpc");
    }

    #[test]
    fn accessors_reflect_parent_and_annotations() {
        let db = Arc::new(Resource::container("db"));
        let api = Arc::new(
            Resource::process("api")
                .with_parent(&db)
                .with_annotation(EndpointAnnotation::new("http", "http")),
        );
        assert!(api.has_structural_parent());
        assert!(!db.has_structural_parent());

        db.set_parent(&api).unwrap();
        assert!(!db.has_structural_parent());
        assert!(Arc::ptr_eq(&db.parent().unwrap(), &api));

        api.annotate_default(EndpointAnnotation::new("admin", "http")).unwrap();
        assert_eq!(api.last_annotation::<EndpointAnnotation>().unwrap().name(), "admin");
        assert!(api.last_annotation::<RelationshipAnnotation>().is_none());

        let snapshot = api.annotation_snapshot();
        api.annotate_default(EndpointAnnotation::new("grpc", "http2")).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(api.annotations::<EndpointAnnotation>().len(), 3);
    }
}
