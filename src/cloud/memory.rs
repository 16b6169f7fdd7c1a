//! In-process cloud backend.
//!
//! `MemoryBackend` implements [`CloudBackend`] by keeping resources in
//! memory and recording every call in order. It powers `deploy --dry-run`
//! and lets tests assert on exactly what the sequencer asked for.
//!
//! # Example
//!
//! ```
//! use overcast::cloud::{BackendCall, CloudBackend, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! let id = backend.create_network("demo_net", "10.0.0.0/24").unwrap();
//! assert_eq!(id, "net-1");
//! assert!(matches!(backend.calls()[0], BackendCall::CreateNetwork { .. }));
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::stack::RuleSpec;

use super::{BackendError, BackendResult, CloudBackend, NodeRequest, ResourceSummary};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateNetwork {
        name: String,
        cidr: String,
    },
    CreateSecurityGroup {
        name: String,
        rules: Vec<RuleSpec>,
    },
    CreatePort {
        name: String,
        network_id: String,
        security_group_ids: Vec<String>,
    },
    CreateKeypair {
        name: String,
    },
    CreateNode(NodeRequest),
    Delete {
        kind: &'static str,
        id: String,
    },
}

impl BackendCall {
    /// Short kind label, handy for ordering assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendCall::CreateNetwork { .. } => "network",
            BackendCall::CreateSecurityGroup { .. } => "security_group",
            BackendCall::CreatePort { .. } => "port",
            BackendCall::CreateKeypair { .. } => "keypair",
            BackendCall::CreateNode(_) => "node",
            BackendCall::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<BackendCall>,
    counter: usize,
    networks: BTreeMap<String, String>,
    security_groups: BTreeMap<String, String>,
    ports: BTreeMap<String, String>,
    keypairs: BTreeMap<String, String>,
    nodes: BTreeMap<String, String>,
    addresses: BTreeMap<String, String>,
    fail_on: HashSet<String>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }

    fn check(&self, operation: &str) -> BackendResult<()> {
        if self.fail_on.contains(operation) {
            return Err(BackendError::new(operation, 500, "injected failure"));
        }
        Ok(())
    }
}

/// Recording in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail with status 500.
    pub fn fail_on(&self, operation: &str) {
        self.lock().fail_on.insert(operation.to_string());
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Assign an address to a node, overriding the generated one.
    pub fn set_address(&self, node_id: &str, address: &str) {
        self.lock()
            .addresses
            .insert(node_id.to_string(), address.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn summaries(map: &BTreeMap<String, String>) -> Vec<ResourceSummary> {
    map.iter()
        .map(|(id, name)| ResourceSummary {
            id: id.clone(),
            name: name.clone(),
        })
        .collect()
}

fn remove(
    map: &mut BTreeMap<String, String>,
    operation: &str,
    id: &str,
) -> BackendResult<()> {
    map.remove(id)
        .map(|_| ())
        .ok_or_else(|| BackendError::new(operation, 404, format!("{} not found", id)))
}

impl CloudBackend for MemoryBackend {
    fn create_network(&self, name: &str, cidr: &str) -> BackendResult<String> {
        let mut state = self.lock();
        state.check("create_network")?;
        state.calls.push(BackendCall::CreateNetwork {
            name: name.to_string(),
            cidr: cidr.to_string(),
        });
        let id = state.next_id("net");
        state.networks.insert(id.clone(), name.to_string());
        Ok(id)
    }

    fn create_security_group(&self, name: &str, rules: &[RuleSpec]) -> BackendResult<String> {
        let mut state = self.lock();
        state.check("create_security_group")?;
        state.calls.push(BackendCall::CreateSecurityGroup {
            name: name.to_string(),
            rules: rules.to_vec(),
        });
        let id = state.next_id("sg");
        state.security_groups.insert(id.clone(), name.to_string());
        Ok(id)
    }

    fn create_port(
        &self,
        name: &str,
        network_id: &str,
        security_group_ids: &[String],
    ) -> BackendResult<String> {
        let mut state = self.lock();
        state.check("create_port")?;
        state.calls.push(BackendCall::CreatePort {
            name: name.to_string(),
            network_id: network_id.to_string(),
            security_group_ids: security_group_ids.to_vec(),
        });
        let id = state.next_id("port");
        state.ports.insert(id.clone(), name.to_string());
        Ok(id)
    }

    fn create_keypair(&self, name: &str, public_key: &str) -> BackendResult<()> {
        let mut state = self.lock();
        state.check("create_keypair")?;
        if state.keypairs.contains_key(name) {
            return Err(BackendError::new(
                "create_keypair",
                409,
                format!("keypair {} already exists", name),
            ));
        }
        state.calls.push(BackendCall::CreateKeypair {
            name: name.to_string(),
        });
        state
            .keypairs
            .insert(name.to_string(), public_key.to_string());
        Ok(())
    }

    fn create_node(&self, request: &NodeRequest) -> BackendResult<String> {
        let mut state = self.lock();
        state.check("create_node")?;
        state.calls.push(BackendCall::CreateNode(request.clone()));
        let id = state.next_id("server");
        let address = format!("192.0.2.{}", state.nodes.len() + 10);
        state.nodes.insert(id.clone(), request.name.clone());
        state.addresses.insert(id.clone(), address);
        Ok(id)
    }

    fn node_address(&self, node_id: &str) -> BackendResult<Option<String>> {
        let state = self.lock();
        state.check("node_address")?;
        if !state.nodes.contains_key(node_id) && !state.addresses.contains_key(node_id) {
            return Err(BackendError::new(
                "node_address",
                404,
                format!("{} not found", node_id),
            ));
        }
        Ok(state.addresses.get(node_id).cloned())
    }

    fn list_networks(&self) -> BackendResult<Vec<ResourceSummary>> {
        Ok(summaries(&self.lock().networks))
    }

    fn list_security_groups(&self) -> BackendResult<Vec<ResourceSummary>> {
        Ok(summaries(&self.lock().security_groups))
    }

    fn list_ports(&self) -> BackendResult<Vec<ResourceSummary>> {
        Ok(summaries(&self.lock().ports))
    }

    fn list_keypairs(&self) -> BackendResult<Vec<ResourceSummary>> {
        // Keypairs are addressed by name, so id and name coincide.
        Ok(self
            .lock()
            .keypairs
            .keys()
            .map(|name| ResourceSummary {
                id: name.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn list_nodes(&self) -> BackendResult<Vec<ResourceSummary>> {
        Ok(summaries(&self.lock().nodes))
    }

    fn delete_network(&self, id: &str) -> BackendResult<()> {
        let mut state = self.lock();
        remove(&mut state.networks, "delete_network", id)?;
        state.calls.push(BackendCall::Delete {
            kind: "network",
            id: id.to_string(),
        });
        Ok(())
    }

    fn delete_security_group(&self, id: &str) -> BackendResult<()> {
        let mut state = self.lock();
        remove(&mut state.security_groups, "delete_security_group", id)?;
        state.calls.push(BackendCall::Delete {
            kind: "security_group",
            id: id.to_string(),
        });
        Ok(())
    }

    fn delete_port(&self, id: &str) -> BackendResult<()> {
        let mut state = self.lock();
        remove(&mut state.ports, "delete_port", id)?;
        state.calls.push(BackendCall::Delete {
            kind: "port",
            id: id.to_string(),
        });
        Ok(())
    }

    fn delete_keypair(&self, name: &str) -> BackendResult<()> {
        let mut state = self.lock();
        remove(&mut state.keypairs, "delete_keypair", name)?;
        state.calls.push(BackendCall::Delete {
            kind: "keypair",
            id: name.to_string(),
        });
        Ok(())
    }

    fn delete_node(&self, id: &str) -> BackendResult<()> {
        let mut state = self.lock();
        remove(&mut state.nodes, "delete_node", id)?;
        state.addresses.remove(id);
        state.calls.push(BackendCall::Delete {
            kind: "node",
            id: id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::BlockDevice;

    fn node_request(name: &str) -> NodeRequest {
        NodeRequest {
            name: name.to_string(),
            image_id: "img".to_string(),
            flavor_id: "small".to_string(),
            block_device: BlockDevice::boot_volume("img", 10),
            port_ids: vec![],
            keypair: None,
            user_data: None,
        }
    }

    #[test]
    fn ids_are_sequential_across_kinds() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.create_network("a", "10.0.0.0/24").unwrap(), "net-1");
        assert_eq!(backend.create_security_group("b", &[]).unwrap(), "sg-2");
        assert_eq!(backend.create_port("c", "net-1", &[]).unwrap(), "port-3");
    }

    #[test]
    fn created_resources_are_listable() {
        let backend = MemoryBackend::new();
        let id = backend.create_network("demo", "10.0.0.0/24").unwrap();
        let listed = backend.list_networks().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].name, "demo");
    }

    #[test]
    fn created_resources_are_deletable() {
        let backend = MemoryBackend::new();
        let id = backend.create_node(&node_request("web")).unwrap();
        backend.delete_node(&id).unwrap();
        assert!(backend.list_nodes().unwrap().is_empty());
        assert!(backend.node_address(&id).is_err());
    }

    #[test]
    fn deleting_unknown_resource_fails_with_404() {
        let backend = MemoryBackend::new();
        let err = backend.delete_port("port-99").unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.operation, "delete_port");
    }

    #[test]
    fn duplicate_keypair_conflicts() {
        let backend = MemoryBackend::new();
        backend.create_keypair("pubkey", "ssh-rsa AAAA").unwrap();
        let err = backend.create_keypair("pubkey", "ssh-rsa AAAA").unwrap_err();
        assert_eq!(err.status, 409);
        assert_eq!(backend.list_keypairs().unwrap().len(), 1);
    }

    #[test]
    fn injected_failure_records_nothing() {
        let backend = MemoryBackend::new();
        backend.fail_on("create_network");
        let err = backend.create_network("x", "10.0.0.0/24").unwrap_err();
        assert_eq!(err.operation, "create_network");
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn nodes_get_addresses() {
        let backend = MemoryBackend::new();
        let id = backend.create_node(&node_request("web")).unwrap();
        assert!(backend.node_address(&id).unwrap().is_some());

        backend.set_address(&id, "203.0.113.5");
        assert_eq!(
            backend.node_address(&id).unwrap().as_deref(),
            Some("203.0.113.5")
        );
    }
}
