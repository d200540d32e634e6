//! # Resource graph: the application model.
//!
//! Owns every declared [`Resource`] in registration order and indexes them
//! by name. Parent links inside resources are `Weak` back-pointers; only the
//! graph holds strong references.
//!
//! ## Rules
//! - Names are non-empty and unique.
//! - A structural or annotation-declared parent must already be registered.
//! - Once [`freeze`](ResourceGraph::freeze) is called, [`add`](ResourceGraph::add) fails with
//!   [`GraphError::Frozen`]. Annotations stay mutable.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use super::resource::{Resource, ResourceRef};
use crate::error::GraphError;

#[derive(Default)]
struct Inner {
    resources: Vec<ResourceRef>,
    index: HashMap<Arc<str>, usize>,
}

/// Set of declared resources.
#[derive(Default)]
pub struct ResourceGraph {
    inner: RwLock<Inner>,
    frozen: AtomicBool,
}

impl ResourceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource and returns its shared handle.
    pub fn add(&self, resource: Resource) -> Result<ResourceRef, GraphError> {
        let name = resource.name_arc().clone();
        if name.trim().is_empty() {
            return Err(GraphError::EmptyName);
        }
        if self.is_frozen() {
            return Err(GraphError::Frozen {
                name: name.to_string(),
            });
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.index.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                name: name.to_string(),
            });
        }
        if let Some(link) = resource.parent_link() {
            let registered = link.upgrade().filter(|p| {
                inner
                    .index
                    .get(p.name())
                    .is_some_and(|&i| Arc::ptr_eq(&inner.resources[i], p))
            });
            if registered.is_none() {
                return Err(GraphError::UnknownParent {
                    child: name.to_string(),
                    parent: link
                        .upgrade()
                        .map_or_else(|| "<dropped>".to_string(), |p| p.name().to_string()),
                });
            }
        }

        let resource = Arc::new(resource);
        let pos = inner.resources.len();
        inner.resources.push(Arc::clone(&resource));
        inner.index.insert(name, pos);
        debug!(resource = resource.name(), kind = ?resource.kind(), "resource registered");
        Ok(resource)
    }

    /// Looks up a resource by name.
    pub fn get(&self, name: &str) -> Option<ResourceRef> {
        let inner = self.read();
        inner.index.get(name).map(|&i| Arc::clone(&inner.resources[i]))
    }

    /// True if this exact resource (by identity) is registered.
    pub fn contains(&self, resource: &Resource) -> bool {
        let inner = self.read();
        inner
            .index
            .get(resource.name())
            .is_some_and(|&i| inner.resources[i].is(resource))
    }

    /// Snapshot of all resources in registration order.
    pub fn resources(&self) -> Vec<ResourceRef> {
        self.read().resources.clone()
    }

    /// Iterates a snapshot of the resources; later additions are not observed.
    pub fn iter(&self) -> std::vec::IntoIter<ResourceRef> {
        self.resources().into_iter()
    }

    /// Sorted list of resource names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().index.keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().resources.is_empty()
    }

    /// Freezes the topology. Idempotent.
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            debug!(resources = self.len(), "resource graph frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<Arc<str>> = self
            .read()
            .resources
            .iter()
            .map(|r| r.name_arc().clone())
            .collect();
        f.debug_struct("ResourceGraph")
            .field("resources", &names)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
