//! # Annotation store with append/replace policy.
//!
//! Annotations are stored as type-erased `Arc`s tagged with their [`TypeId`].
//! Queries downcast back to the concrete type, so there is no closed
//! annotation hierarchy.
//!
//! ## Rules
//! - Insertion order is preserved across all types.
//! - [`AnnotationBehavior::Append`] always pushes at the end.
//! - [`AnnotationBehavior::Replace`] drops every entry with the **same** type tag, then pushes.
//! - Queries never fail; an empty result means "none of that type".
//!
//! ```text
//! add(Endpoint#1, Append)  → [Endpoint#1]
//! add(Volume,     Append)  → [Endpoint#1, Volume]
//! add(Endpoint#2, Append)  → [Endpoint#1, Volume, Endpoint#2]
//! add(Endpoint#3, Replace) → [Volume, Endpoint#3]
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Marker trait for resource metadata.
///
/// Any `Debug + Send + Sync + 'static` type can opt in:
///
/// ```
/// use apphost::Annotation;
///
/// #[derive(Debug)]
/// struct Volume { path: String }
///
/// impl Annotation for Volume {}
/// ```
pub trait Annotation: Any + Send + Sync + fmt::Debug {}

/// Mutation policy applied when adding an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationBehavior {
    /// Keep existing annotations of the same type and add the new one at the end.
    #[default]
    Append,
    /// Remove every annotation of the exact same type, then add the new one.
    Replace,
}

/// One stored annotation.
#[derive(Clone)]
struct Entry {
    tag: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Ordered multiset of annotations attached to one resource.
#[derive(Clone, Default)]
pub struct Annotations {
    entries: Vec<Entry>,
}

impl Annotations {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an annotation according to `behavior` and returns the stored handle.
    pub fn add<T: Annotation>(&mut self, annotation: T, behavior: AnnotationBehavior) -> Arc<T> {
        self.add_arc(Arc::new(annotation), behavior)
    }

    /// Adds an already shared annotation according to `behavior`.
    pub fn add_arc<T: Annotation>(&mut self, annotation: Arc<T>, behavior: AnnotationBehavior) -> Arc<T> {
        let tag = TypeId::of::<T>();
        if behavior == AnnotationBehavior::Replace {
            self.entries.retain(|e| e.tag != tag);
        }
        self.entries.push(Entry {
            tag,
            type_name: type_name::<T>(),
            value: annotation.clone(),
        });
        annotation
    }

    /// Returns all annotations of type `T` in insertion order.
    pub fn of_type<T: Annotation>(&self) -> Vec<Arc<T>> {
        self.iter_type::<T>().collect()
    }

    /// Returns the first annotation of type `T`, if any.
    pub fn first<T: Annotation>(&self) -> Option<Arc<T>> {
        self.iter_type::<T>().next()
    }

    /// Returns the most recently added annotation of type `T`, if any.
    pub fn last<T: Annotation>(&self) -> Option<Arc<T>> {
        self.iter_type::<T>().last()
    }

    /// True if at least one annotation of type `T` is present.
    pub fn contains<T: Annotation>(&self) -> bool {
        let tag = TypeId::of::<T>();
        self.entries.iter().any(|e| e.tag == tag)
    }

    /// Total number of annotations of all types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store holds no annotations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn iter_type<T: Annotation>(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        let tag = TypeId::of::<T>();
        self.entries
            .iter()
            .filter(move |e| e.tag == tag)
            .filter_map(|e| Arc::clone(&e.value).downcast::<T>().ok())
    }
}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.type_name))
            .finish()
    }
}
