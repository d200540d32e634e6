//! Annotations understood by the core itself.

use std::sync::{Arc, OnceLock, Weak};

use super::Annotation;
use crate::resources::{Resource, ResourceRef};

/// Relationship kind that declares a parent.
pub const PARENT_RELATIONSHIP: &str = "Parent";

/// Declares a relationship from the annotated resource to another resource.
///
/// Only relationships of kind [`PARENT_RELATIONSHIP`] take part in parent
/// resolution; other kinds are informational. The target is held as a
/// non-owning back-pointer.
#[derive(Debug, Clone)]
pub struct RelationshipAnnotation {
    resource: Weak<Resource>,
    kind: Arc<str>,
}

impl RelationshipAnnotation {
    /// Relationship of an arbitrary kind.
    pub fn new(resource: &ResourceRef, kind: impl Into<Arc<str>>) -> Self {
        Self {
            resource: Arc::downgrade(resource),
            kind: kind.into(),
        }
    }

    /// Parent relationship.
    pub fn parent(resource: &ResourceRef) -> Self {
        Self::new(resource, PARENT_RELATIONSHIP)
    }

    /// Relationship kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// True for the parent relationship kind.
    pub fn is_parent(&self) -> bool {
        &*self.kind == PARENT_RELATIONSHIP
    }

    /// Target resource, if it still exists.
    pub fn resource(&self) -> Option<ResourceRef> {
        self.resource.upgrade()
    }

    pub(crate) fn target(&self) -> &Weak<Resource> {
        &self.resource
    }
}

impl Annotation for RelationshipAnnotation {}

/// Concrete address assigned to an endpoint during startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedEndpoint {
    /// Host name.
    pub host: String,
    /// Host port.
    pub port: u16,
    /// URI scheme copied from the endpoint.
    pub scheme: String,
}

impl AllocatedEndpoint {
    /// `scheme://host:port`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Network endpoint exposed by a resource.
///
/// `port` pins the host port; without it a port is picked from
/// [`Config::port_range`](crate::Config::port_range). The allocation slot is
/// write-once and filled before `AfterEndpointsAllocated` is published.
#[derive(Debug)]
pub struct EndpointAnnotation {
    name: String,
    scheme: String,
    port: Option<u16>,
    target_port: Option<u16>,
    allocated: OnceLock<AllocatedEndpoint>,
}

impl EndpointAnnotation {
    /// Endpoint with a dynamically allocated port.
    pub fn new(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scheme: scheme.into(),
            port: None,
            target_port: None,
            allocated: OnceLock::new(),
        }
    }

    /// Pins the host port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Port the workload listens on inside its container/process.
    pub fn with_target_port(mut self, port: u16) -> Self {
        self.target_port = Some(port);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn target_port(&self) -> Option<u16> {
        self.target_port
    }

    /// Allocated address, once endpoints have been allocated.
    pub fn allocated(&self) -> Option<&AllocatedEndpoint> {
        self.allocated.get()
    }

    /// Stores the allocation. Returns `false` if the endpoint was already allocated.
    pub(crate) fn allocate(&self, host: &str, port: u16) -> bool {
        self.allocated
            .set(AllocatedEndpoint {
                host: host.to_string(),
                port,
                scheme: self.scheme.clone(),
            })
            .is_ok()
    }
}

impl Annotation for EndpointAnnotation {}
