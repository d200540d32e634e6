//! # Relationship evaluator.
//!
//! Materializes the direct parent → children structure of a [`ResourceGraph`].
//! Nothing is cached: every call reads the graph as it is now.
//!
//! ## Flow
//! ```text
//! evaluate(graph)
//!   ├─► one key per resource (graph order, empty child list)
//!   ├─► for each resource: parent = structural ?? last "Parent" annotation
//!   │       ├─ parent outside graph / dropped ─► UnknownParent
//!   │       ├─ parent == resource             ─► SelfParent
//!   │       └─ record edge (declaration order among siblings)
//!   └─► walk every parent chain once          ─► ParentCycle on revisit
//! ```

use std::sync::Arc;

use super::ChildLookup;
use crate::error::GraphError;
use crate::resources::{Resource, ResourceGraph, ResourceRef};

/// Computes parent/child lookups over a resource graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipEvaluator;

impl RelationshipEvaluator {
    /// Resolves the parent of a single resource (structural first, then annotation).
    pub fn parent_of(resource: &Resource) -> Option<ResourceRef> {
        resource.parent()
    }

    /// Builds the lookup for every resource of `graph`.
    pub fn evaluate(graph: &ResourceGraph) -> Result<ChildLookup, GraphError> {
        let resources = graph.resources();
        let mut parents: Vec<Option<usize>> = Vec::with_capacity(resources.len());

        for r in &resources {
            let Some(link) = r.parent_link() else {
                parents.push(None);
                continue;
            };
            let unknown = |parent: String| GraphError::UnknownParent {
                child: r.name().to_string(),
                parent,
            };
            let parent = link.upgrade().ok_or_else(|| unknown("<dropped>".into()))?;
            let pos = resources
                .iter()
                .position(|c| Arc::ptr_eq(c, &parent))
                .ok_or_else(|| unknown(parent.name().to_string()))?;
            if Arc::ptr_eq(&parent, r) {
                return Err(GraphError::SelfParent {
                    name: r.name().to_string(),
                });
            }
            parents.push(Some(pos));
        }

        detect_cycles(&resources, &parents)?;

        let mut lookup = ChildLookup::with_keys(resources);
        for (child, parent) in parents.iter().enumerate() {
            if let Some(p) = *parent {
                lookup.insert_edge(p, child);
            }
        }
        Ok(lookup)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Follows each parent chain once; a chain reaching a node already on the
/// current path is a cycle.
fn detect_cycles(resources: &[ResourceRef], parents: &[Option<usize>]) -> Result<(), GraphError> {
    let mut marks = vec![Mark::Unvisited; resources.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..resources.len() {
        let mut cur = Some(start);
        while let Some(i) = cur {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    let from = path.iter().position(|&p| p == i).unwrap_or(0);
                    let mut names: Vec<String> = path[from..]
                        .iter()
                        .map(|&p| resources[p].name().to_string())
                        .collect();
                    names.push(resources[i].name().to_string());
                    return Err(GraphError::ParentCycle { path: names });
                }
                Mark::Unvisited => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    cur = parents[i];
                }
            }
        }
        for &p in &path {
            marks[p] = Mark::Done;
        }
        path.clear();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::RelationshipAnnotation;

    fn names(list: &[ResourceRef]) -> Vec<&str> {
        list.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn parent_child_grandchild() {
        let graph = ResourceGraph::new();
        let parent = graph.add(Resource::process("parent")).unwrap();
        let child = graph.add(Resource::process("child").with_parent(&parent)).unwrap();
        let grandchild = graph
            .add(Resource::process("grandchild").with_parent(&child))
            .unwrap();

        let lookup = RelationshipEvaluator::evaluate(&graph).unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(names(lookup.children_of(&parent)), ["child"]);
        assert_eq!(names(lookup.children_of(&child)), ["grandchild"]);
        assert!(lookup.children_of(&grandchild).is_empty());
        assert!(lookup.contains(&grandchild));
    }

    #[test]
    fn every_resource_is_a_key() {
        let graph = ResourceGraph::new();
        for n in ["a", "b", "c"] {
            graph.add(Resource::container(n)).unwrap();
        }
        let lookup = RelationshipEvaluator::evaluate(&graph).unwrap();
        let keys: Vec<&str> = lookup.iter().map(|(r, _)| r.name()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(lookup.iter().all(|(_, c)| c.is_empty()));
        assert_eq!(names(&lookup.roots()), ["a", "b", "c"]);
    }

    #[test]
    fn mixed_structural_and_annotation_chain() {
        let graph = ResourceGraph::new();
        let root = graph.add(Resource::placeholder("root")).unwrap();
        let l1 = graph
            .add(Resource::process("l1").with_annotation(RelationshipAnnotation::parent(&root)))
            .unwrap();
        let l2 = graph.add(Resource::process("l2").with_parent(&l1)).unwrap();
        let l3 = graph.add(Resource::process("l3")).unwrap();
        l3.set_parent(&l2).unwrap();
        let sibling = graph.add(Resource::process("sibling").with_parent(&l1)).unwrap();

        let lookup = RelationshipEvaluator::evaluate(&graph).unwrap();
        assert_eq!(names(lookup.children_of(&l1)), ["l2", "sibling"]);
        assert_eq!(names(&lookup.descendants(&root)), ["l1", "l2", "l3", "sibling"]);
        assert!(lookup.descendants(&sibling).is_empty());
        assert!(Arc::ptr_eq(lookup.parent_of(&l3).unwrap(), &l2));
        assert_eq!(names(&lookup.roots()), ["root"]);
    }

    #[test]
    fn walking_a_deep_chain_reaches_every_descendant_once() {
        let graph = ResourceGraph::new();
        let root = graph.add(Resource::process("n0")).unwrap();
        let mut prev = Arc::clone(&root);
        for i in 1..50 {
            let r = Resource::process(format!("n{i}"));
            let r = if i % 2 == 0 {
                r.with_parent(&prev)
            } else {
                r.with_annotation(RelationshipAnnotation::parent(&prev))
            };
            prev = graph.add(r).unwrap();
        }

        let lookup = RelationshipEvaluator::evaluate(&graph).unwrap();
        let mut cur = Arc::clone(&root);
        let mut seen = 0;
        while let [only] = lookup.children_of(&cur) {
            cur = Arc::clone(only);
            seen += 1;
        }
        assert_eq!(seen, 49);
        assert_eq!(lookup.descendants(&root).len(), 49);
    }

    #[test]
    fn annotation_cycle_is_reported() {
        let graph = ResourceGraph::new();
        let a = graph.add(Resource::process("a")).unwrap();
        let b = graph.add(Resource::process("b")).unwrap();
        let c = graph.add(Resource::process("c")).unwrap();
        a.set_parent(&b).unwrap();
        b.set_parent(&c).unwrap();
        c.set_parent(&a).unwrap();

        let err = RelationshipEvaluator::evaluate(&graph).unwrap_err();
        assert_eq!(
            err,
            GraphError::ParentCycle { path: vec!["a".into(), "b".into(), "c".into(), "a".into()] }
        );
    }

    #[test]
    fn chain_into_a_cycle_reports_only_the_cycle() {
        let graph = ResourceGraph::new();
        let a = graph.add(Resource::process("a")).unwrap();
        let b = graph.add(Resource::process("b")).unwrap();
        graph.add(Resource::process("tail").with_parent(&a)).unwrap();
        a.set_parent(&b).unwrap();
        b.set_parent(&a).unwrap();

        match RelationshipEvaluator::evaluate(&graph) {
            Err(GraphError::ParentCycle { path }) => assert_eq!(path, ["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn annotation_parent_outside_graph_is_rejected() {
        let graph = ResourceGraph::new();
        let child = graph.add(Resource::process("child")).unwrap();
        let loose = Arc::new(Resource::process("loose"));
        child.set_parent(&loose).unwrap();

        let err = RelationshipEvaluator::evaluate(&graph).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownParent { child: "child".into(), parent: "loose".into() }
        );

        drop(loose);
        let err = RelationshipEvaluator::evaluate(&graph).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownParent { child: "child".into(), parent: "<dropped>".into() }
        );
    }

    #[test]
    fn evaluation_reflects_later_mutations() {
        let graph = ResourceGraph::new();
        let a = graph.add(Resource::process("a")).unwrap();
        let b = graph.add(Resource::process("b")).unwrap();

        let before = RelationshipEvaluator::evaluate(&graph).unwrap();
        assert!(before.children_of(&a).is_empty());

        b.set_parent(&a).unwrap();
        let after = RelationshipEvaluator::evaluate(&graph).unwrap();
        assert_eq!(names(after.children_of(&a)), ["b"]);
        assert!(Arc::ptr_eq(&RelationshipEvaluator::parent_of(&b).unwrap(), &a));
    }
}
