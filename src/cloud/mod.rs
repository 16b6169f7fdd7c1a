//! Cloud backend capability interface.
//!
//! The provisioning core talks to a cloud only through [`CloudBackend`].
//! Concrete adapters are constructed once per run and passed in explicitly:
//!
//! - [`MemoryBackend`] - in-process recording backend (dry runs, tests)
//! - [`OpenStackBackend`] - Keystone v3 + Neutron + Nova over REST
//!
//! Anything creatable is also listable and deletable, even though the
//! provisioning sequencer never deletes.

pub mod memory;
pub mod openstack;

use serde::Serialize;
use thiserror::Error;

use crate::stack::RuleSpec;

pub use memory::{BackendCall, MemoryBackend};
pub use openstack::{OpenStackBackend, OpenStackCredentials};

/// A failed backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Backend call '{operation}' failed (status {status}): {message}")]
pub struct BackendError {
    /// Backend operation name (e.g. `create_port`).
    pub operation: String,
    /// Provider status code, 0 when the request never got a response.
    pub status: u16,
    /// Provider message.
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &str, status: u16, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            status,
            message: message.into(),
        }
    }
}

/// Boot-from-volume block device for a new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    pub source_image: String,
    pub volume_size_gb: u32,
    pub delete_on_termination: bool,
    pub boot_index: u32,
}

impl BlockDevice {
    /// Root volume built from an image.
    pub fn boot_volume(image_id: &str, size_gb: u32) -> Self {
        Self {
            source_image: image_id.to_string(),
            volume_size_gb: size_gb,
            delete_on_termination: true,
            boot_index: 0,
        }
    }
}

/// Everything the backend needs to create one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRequest {
    pub name: String,
    pub image_id: String,
    pub flavor_id: String,
    pub block_device: BlockDevice,
    pub port_ids: Vec<String>,
    pub keypair: Option<String>,
    pub user_data: Option<String>,
}

/// Minimal listing entry for any resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub id: String,
    pub name: String,
}

/// Result alias for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Capability set for creating, listing and deleting cloud primitives.
///
/// All calls are synchronous. Implementations keep whatever session state
/// they need internally, which is why every method takes `&self`.
pub trait CloudBackend {
    /// Create a network plus one IPv4 subnet covering `cidr`. Returns the network id.
    fn create_network(&self, name: &str, cidr: &str) -> BackendResult<String>;

    /// Create a security group and its ingress rules, in order. Returns the group id.
    fn create_security_group(&self, name: &str, rules: &[RuleSpec]) -> BackendResult<String>;

    fn create_port(
        &self,
        name: &str,
        network_id: &str,
        security_group_ids: &[String],
    ) -> BackendResult<String>;

    fn create_keypair(&self, name: &str, public_key: &str) -> BackendResult<()>;

    /// Create a server. Returns the server id.
    fn create_node(&self, request: &NodeRequest) -> BackendResult<String>;

    /// Reachable address of a server, if it has one yet.
    fn node_address(&self, node_id: &str) -> BackendResult<Option<String>>;

    fn list_networks(&self) -> BackendResult<Vec<ResourceSummary>>;
    fn list_security_groups(&self) -> BackendResult<Vec<ResourceSummary>>;
    fn list_ports(&self) -> BackendResult<Vec<ResourceSummary>>;
    fn list_keypairs(&self) -> BackendResult<Vec<ResourceSummary>>;
    fn list_nodes(&self) -> BackendResult<Vec<ResourceSummary>>;

    fn delete_network(&self, id: &str) -> BackendResult<()>;
    fn delete_security_group(&self, id: &str) -> BackendResult<()>;
    fn delete_port(&self, id: &str) -> BackendResult<()>;
    fn delete_keypair(&self, name: &str) -> BackendResult<()>;
    fn delete_node(&self, id: &str) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_operation_and_status() {
        let err = BackendError::new("create_port", 404, "network not found");
        let msg = err.to_string();
        assert!(msg.contains("create_port"));
        assert!(msg.contains("404"));
        assert!(msg.contains("network not found"));
    }

    #[test]
    fn boot_volume_defaults() {
        let bd = BlockDevice::boot_volume("img-1", 20);
        assert_eq!(bd.source_image, "img-1");
        assert_eq!(bd.volume_size_gb, 20);
        assert!(bd.delete_on_termination);
        assert_eq!(bd.boot_index, 0);
    }

    #[test]
    fn trait_is_object_safe() {
        let backend = MemoryBackend::new();
        let dyn_backend: &dyn CloudBackend = &backend;
        assert!(dyn_backend.list_networks().unwrap().is_empty());
    }
}
