//! # Endpoint allocation.
//!
//! Runs between `BeforeStart` and `AfterEndpointsAllocated`. Every
//! [`EndpointAnnotation`] without an allocation gets `(host, port)`:
//!
//! ```text
//! pass 1: already allocated ports + fixed ports ─► used set   (duplicate fixed port → error)
//! pass 2: each unallocated endpoint, in graph order
//!           ├─ fixed port   ─► plan(host, port)
//!           └─ dynamic      ─► next free port of port_range   (exhausted → error, nothing allocated)
//! pass 3: fill every planned slot
//! ```

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::debug;

use crate::annotations::EndpointAnnotation;
use crate::config::Config;
use crate::error::LifecycleError;
use crate::resources::{ResourceGraph, ResourceRef};

/// Assigns concrete addresses to endpoint annotations.
#[derive(Debug, Clone)]
pub struct EndpointAllocator {
    host: String,
    range: RangeInclusive<u16>,
}

impl EndpointAllocator {
    pub fn new(host: impl Into<String>, range: RangeInclusive<u16>) -> Self {
        Self {
            host: host.into(),
            range,
        }
    }

    /// Allocator using [`Config::endpoint_host`] and [`Config::port_range`].
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.endpoint_host.clone(), cfg.port_range.clone())
    }

    /// Allocates every pending endpoint of `model`. Returns how many were allocated.
    pub fn allocate(&self, model: &ResourceGraph) -> Result<usize, LifecycleError> {
        let endpoints: Vec<(ResourceRef, Arc<EndpointAnnotation>)> = model
            .iter()
            .flat_map(|r| {
                r.annotations::<EndpointAnnotation>()
                    .into_iter()
                    .map(move |ep| (Arc::clone(&r), ep))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut used = HashSet::new();
        for (resource, ep) in &endpoints {
            if let Some(done) = ep.allocated() {
                used.insert(done.port);
                continue;
            }
            if let Some(port) = ep.port() {
                if !used.insert(port) {
                    return Err(failure(resource, ep, format!("port {port} is already in use")));
                }
            }
        }

        // Every port is planned before any write-once slot is filled; a failure allocates nothing.
        let mut free = self.range.clone().filter(|p| !used.contains(p));
        let mut plan = Vec::with_capacity(endpoints.len());
        for (resource, ep) in &endpoints {
            if ep.allocated().is_some() {
                continue;
            }
            let port = match ep.port() {
                Some(port) => port,
                None => free.next().ok_or_else(|| {
                    failure(
                        resource,
                        ep,
                        format!("port range {}..={} is exhausted", self.range.start(), self.range.end()),
                    )
                })?,
            };
            plan.push((resource, ep, port));
        }

        let mut allocated = 0;
        for (resource, ep, port) in plan {
            if ep.allocate(&self.host, port) {
                debug!(resource = resource.name(), endpoint = ep.name(), host = %self.host, port, "endpoint allocated");
                allocated += 1;
            }
        }
        Ok(allocated)
    }
}

fn failure(resource: &ResourceRef, ep: &EndpointAnnotation, reason: String) -> LifecycleError {
    LifecycleError::EndpointAllocation {
        resource: resource.name().to_string(),
        endpoint: ep.name().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;

    fn endpoint(r: &ResourceRef, name: &str) -> Arc<EndpointAnnotation> {
        r.annotations::<EndpointAnnotation>()
            .into_iter()
            .find(|ep| ep.name() == name)
            .unwrap()
    }

    #[test]
    fn fixed_ports_are_kept_and_dynamic_ports_are_distinct() {
        let graph = ResourceGraph::new();
        let api = graph
            .add(
                Resource::process("api")
                    .with_annotation(EndpointAnnotation::new("http", "http"))
                    .with_annotation(EndpointAnnotation::new("admin", "http").with_port(20001)),
            )
            .unwrap();
        let db = graph
            .add(Resource::container("db").with_annotation(EndpointAnnotation::new("tcp", "tcp")))
            .unwrap();

        let allocator = EndpointAllocator::new("127.0.0.1", 20000..=20002);
        assert_eq!(allocator.allocate(&graph).unwrap(), 3);

        assert_eq!(endpoint(&api, "http").allocated().unwrap().port, 20000);
        assert_eq!(endpoint(&api, "admin").allocated().unwrap().url(), "http://127.0.0.1:20001");
        assert_eq!(endpoint(&db, "tcp").allocated().unwrap().port, 20002);

        // Second run finds nothing pending.
        assert_eq!(allocator.allocate(&graph).unwrap(), 0);
    }

    #[test]
    fn duplicate_fixed_ports_are_rejected() {
        let graph = ResourceGraph::new();
        graph
            .add(Resource::process("a").with_annotation(EndpointAnnotation::new("http", "http").with_port(8080)))
            .unwrap();
        graph
            .add(Resource::process("b").with_annotation(EndpointAnnotation::new("http", "http").with_port(8080)))
            .unwrap();

        let err = EndpointAllocator::new("localhost", 10000..=10010).allocate(&graph).unwrap_err();
        assert_eq!(err.as_label(), "lifecycle_endpoint_allocation");
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn exhausted_range_is_an_error() {
        let graph = ResourceGraph::new();
        graph
            .add(
                Resource::process("a")
                    .with_annotation(EndpointAnnotation::new("one", "http"))
                    .with_annotation(EndpointAnnotation::new("two", "http")),
            )
            .unwrap();

        let err = EndpointAllocator::new("localhost", 10000..=10000).allocate(&graph).unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn exhausted_range_allocates_nothing() {
        let graph = ResourceGraph::new();
        let a = graph
            .add(
                Resource::process("a")
                    .with_annotation(EndpointAnnotation::new("one", "http"))
                    .with_annotation(EndpointAnnotation::new("pinned", "http").with_port(9000)),
            )
            .unwrap();
        let b = graph
            .add(Resource::process("b").with_annotation(EndpointAnnotation::new("two", "http")))
            .unwrap();

        assert!(EndpointAllocator::new("localhost", 10000..=10000).allocate(&graph).is_err());
        assert!(endpoint(&a, "one").allocated().is_none());
        assert!(endpoint(&a, "pinned").allocated().is_none());
        assert!(endpoint(&b, "two").allocated().is_none());

        // A wider range can still allocate everything afterwards.
        assert_eq!(EndpointAllocator::new("localhost", 10000..=10001).allocate(&graph).unwrap(), 3);
        assert_eq!(endpoint(&b, "two").allocated().unwrap().port, 10001);
    }
}
