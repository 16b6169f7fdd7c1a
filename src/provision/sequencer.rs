//! Ordered resource creation.
//!
//! The sequencer walks a [`Stack`] in a fixed order: every network, then
//! every security group, then every node. Nodes reference networks and
//! security groups by their declared names, so those must already be bound
//! when the first node is built.
//!
//! The first backend failure stops the run. Resources created before the
//! failure stay in place and remain visible in the caller's bindings.

use tracing::{debug, info};

use crate::cloud::{BackendResult, BlockDevice, CloudBackend, NodeRequest};
use crate::config::ResourceMapping;
use crate::stack::{NodeSpec, Stack};

use super::bindings::RuntimeBindings;

/// Per-run inputs that apply to every resource.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
    /// Prepended to every backend-visible name as `<prefix>_<name>`.
    pub prefix: Option<String>,

    /// Keypair attached to every node.
    pub keypair: Option<String>,

    /// User data passed to every node.
    pub userdata: Option<String>,
}

impl ProvisionOptions {
    /// Backend-visible name for a declared resource.
    pub fn name_for(&self, base_name: &str) -> String {
        prefixed_name(self.prefix.as_deref(), base_name)
    }
}

/// `prefix_base` when a prefix is set, `base` otherwise.
pub fn prefixed_name(prefix: Option<&str>, base_name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}_{}", p, base_name),
        _ => base_name.to_string(),
    }
}

/// Where a nic's network id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSource {
    /// The mapping file's network table.
    Mapping,
    /// A network created earlier in this run.
    Binding,
    /// The symbol itself, taken as a backend id.
    Verbatim,
}

/// Resolve a nic's network symbol: mapping, then bindings, then verbatim.
pub fn resolve_network(
    symbol: &str,
    mapping: &ResourceMapping,
    bindings: &RuntimeBindings,
) -> (String, NetworkSource) {
    if let Some(id) = mapping.network(symbol) {
        (id.to_string(), NetworkSource::Mapping)
    } else if let Some(id) = bindings.network(symbol) {
        (id.to_string(), NetworkSource::Binding)
    } else {
        (symbol.to_string(), NetworkSource::Verbatim)
    }
}

/// Creates the resources of a stack against a backend.
pub struct Sequencer<'a> {
    backend: &'a dyn CloudBackend,
    mapping: &'a ResourceMapping,
    options: &'a ProvisionOptions,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        backend: &'a dyn CloudBackend,
        mapping: &'a ResourceMapping,
        options: &'a ProvisionOptions,
    ) -> Self {
        Self {
            backend,
            mapping,
            options,
        }
    }

    /// Provision a stack into fresh bindings.
    pub fn run(&self, stack: &Stack) -> BackendResult<RuntimeBindings> {
        let mut bindings = RuntimeBindings::new();
        self.run_into(stack, &mut bindings)?;
        Ok(bindings)
    }

    /// Provision a stack, adding to bindings from earlier steps of the run.
    pub fn run_into(&self, stack: &Stack, bindings: &mut RuntimeBindings) -> BackendResult<()> {
        for (base_name, network) in &stack.networks {
            let name = self.options.name_for(base_name);
            let id = self.backend.create_network(&name, &network.cidr)?;
            info!("Created network {} ({}) as {}", name, network.cidr, id);
            bindings.networks.insert(base_name.clone(), id);
        }

        for (base_name, rules) in &stack.securitygroups {
            let name = self.options.name_for(base_name);
            let id = self.backend.create_security_group(&name, rules)?;
            info!(
                "Created security group {} with {} rule(s) as {}",
                name,
                rules.len(),
                id
            );
            bindings.security_groups.insert(base_name.clone(), id);
        }

        for (base_name, node) in &stack.nodes {
            let id = self.create_node(base_name, node, bindings)?;
            bindings.nodes.insert(base_name.clone(), id);
        }

        Ok(())
    }

    fn create_node(
        &self,
        base_name: &str,
        node: &NodeSpec,
        bindings: &RuntimeBindings,
    ) -> BackendResult<String> {
        let name = self.options.name_for(base_name);
        let image_id = self.mapping.image(&node.image);
        let flavor_id = self.mapping.flavor(&node.flavor);
        debug!(
            "Node {}: image {} -> {}, flavor {} -> {}",
            name, node.image, image_id, node.flavor, flavor_id
        );

        let mut port_ids = Vec::with_capacity(node.nics.len());
        for (idx, nic) in node.nics.iter().enumerate() {
            let (network_id, source) = resolve_network(&nic.network, self.mapping, bindings);
            debug!(
                "Node {} eth{}: network {} -> {} ({:?})",
                name, idx, nic.network, network_id, source
            );

            let secgroup_ids: Vec<String> = nic
                .secgroups
                .iter()
                .map(|sg| bindings.security_group(sg).unwrap_or(sg).to_string())
                .collect();

            let port_name = format!("{}_eth{}", name, idx);
            let port_id = self
                .backend
                .create_port(&port_name, &network_id, &secgroup_ids)?;
            debug!("Created port {} as {}", port_name, port_id);
            port_ids.push(port_id);
        }

        let request = NodeRequest {
            name: name.clone(),
            image_id: image_id.to_string(),
            flavor_id: flavor_id.to_string(),
            block_device: BlockDevice::boot_volume(image_id, node.disk),
            port_ids,
            keypair: self.options.keypair.clone(),
            user_data: self.options.userdata.clone(),
        };

        let id = self.backend.create_node(&request)?;
        info!("Created node {} as {}", name, id);
        Ok(id)
    }
}
