//! Parent → children lookup produced by the relationship evaluator.

use std::collections::HashMap;
use std::sync::Arc;

use crate::resources::{Resource, ResourceRef};

/// Direct parent → children edges for every resource of a graph.
///
/// Keys follow graph order; children follow declaration order. Every
/// resource is a key, childless ones map to an empty slice.
#[derive(Debug, Clone, Default)]
pub struct ChildLookup {
    entries: Vec<(ResourceRef, Vec<ResourceRef>)>,
    parents: Vec<Option<usize>>,
    index: HashMap<Arc<str>, usize>,
}

impl ChildLookup {
    pub(crate) fn with_keys(resources: Vec<ResourceRef>) -> Self {
        let index = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name_arc().clone(), i))
            .collect();
        let parents = vec![None; resources.len()];
        let entries = resources.into_iter().map(|r| (r, Vec::new())).collect();
        Self {
            entries,
            parents,
            index,
        }
    }

    pub(crate) fn insert_edge(&mut self, parent: usize, child: usize) {
        let child_ref = Arc::clone(&self.entries[child].0);
        self.entries[parent].1.push(child_ref);
        self.parents[child] = Some(parent);
    }

    fn position(&self, resource: &Resource) -> Option<usize> {
        self.index
            .get(resource.name())
            .copied()
            .filter(|&i| self.entries[i].0.is(resource))
    }

    /// Direct children of `resource`; empty if it has none or is unknown.
    pub fn children_of(&self, resource: &Resource) -> &[ResourceRef] {
        self.position(resource)
            .map_or(&[][..], |i| self.entries[i].1.as_slice())
    }

    /// True if `resource` is a key of this lookup.
    pub fn contains(&self, resource: &Resource) -> bool {
        self.position(resource).is_some()
    }

    /// Resolved parent of `resource` as recorded in this lookup.
    pub fn parent_of(&self, resource: &Resource) -> Option<&ResourceRef> {
        self.position(resource)
            .and_then(|i| self.parents[i])
            .map(|p| &self.entries[p].0)
    }

    /// All descendants of `resource`, depth-first, each exactly once.
    pub fn descendants(&self, resource: &Resource) -> Vec<ResourceRef> {
        let mut out = Vec::new();
        let mut stack: Vec<&ResourceRef> = self.children_of(resource).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(Arc::clone(next));
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }

    /// Resources without a parent, in graph order.
    pub fn roots(&self) -> Vec<ResourceRef> {
        self.entries
            .iter()
            .zip(&self.parents)
            .filter(|(_, p)| p.is_none())
            .map(|((r, _), _)| Arc::clone(r))
            .collect()
    }

    /// Iterates `(resource, children)` in graph order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceRef, &[ResourceRef])> {
        self.entries.iter().map(|(r, c)| (r, c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
