//! Stack description schema.
//!
//! These structs map to the stack YAML referenced by a `provision` step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of networks, security groups and nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stack {
    /// Nodes to boot, keyed by base name.
    pub nodes: BTreeMap<String, NodeSpec>,

    /// Networks created by this stack (dynamic networks).
    pub networks: BTreeMap<String, NetworkSpec>,

    /// Security groups, each a list of ingress rules.
    pub securitygroups: BTreeMap<String, Vec<RuleSpec>>,
}

impl Stack {
    /// Whether `name` is a network this stack creates itself.
    pub fn is_dynamic_network(&self, name: &str) -> bool {
        self.networks.contains_key(name)
    }
}

/// A network created by the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// IPv4 range for the network's single subnet.
    pub cidr: String,
}

/// A compute node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Image symbol or backend id.
    pub image: String,

    /// Flavor symbol or backend id.
    pub flavor: String,

    /// Boot volume size in GB.
    pub disk: u32,

    /// Network interfaces, in attachment order.
    #[serde(default, alias = "networks")]
    pub nics: Vec<NicSpec>,
}

/// One network interface of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicSpec {
    /// Network symbol: a dynamic network, a mapped name, or a backend id.
    pub network: String,

    /// Security groups applied to the port.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secgroups: Vec<String>,
}

/// One ingress rule. Direction is always ingress, ethertype IPv4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub cidr: String,
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = r#"
networks:
  backend:
    cidr: 10.10.0.0/24
securitygroups:
  web:
    - cidr: 0.0.0.0/0
      from_port: 80
      to_port: 80
      protocol: tcp
    - cidr: 0.0.0.0/0
      from_port: 443
      to_port: 443
      protocol: tcp
nodes:
  web:
    image: trusty
    flavor: small
    disk: 10
    nics:
      - network: backend
        secgroups: [web]
      - network: public
"#;

    #[test]
    fn parses_full_stack() {
        let stack: Stack = serde_yaml::from_str(STACK).unwrap();
        assert_eq!(stack.networks["backend"].cidr, "10.10.0.0/24");
        assert_eq!(stack.securitygroups["web"].len(), 2);
        assert_eq!(stack.securitygroups["web"][1].from_port, 443);

        let web = &stack.nodes["web"];
        assert_eq!(web.image, "trusty");
        assert_eq!(web.disk, 10);
        assert_eq!(web.nics.len(), 2);
        assert_eq!(web.nics[0].secgroups, vec!["web".to_string()]);
        assert!(web.nics[1].secgroups.is_empty());
    }

    #[test]
    fn sections_are_optional() {
        let stack: Stack = serde_yaml::from_str("nodes: {}").unwrap();
        assert!(stack.networks.is_empty());
        assert!(stack.securitygroups.is_empty());
    }

    #[test]
    fn accepts_networks_alias_for_nics() {
        let yaml = r#"
nodes:
  db:
    image: xenial
    flavor: large
    disk: 40
    networks:
      - network: private
"#;
        let stack: Stack = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(stack.nodes["db"].nics[0].network, "private");
    }

    #[test]
    fn dynamic_network_lookup() {
        let stack: Stack = serde_yaml::from_str(STACK).unwrap();
        assert!(stack.is_dynamic_network("backend"));
        assert!(!stack.is_dynamic_network("public"));
    }

    #[test]
    fn rejects_node_without_image() {
        let yaml = "nodes:\n  web:\n    flavor: small\n    disk: 10\n";
        assert!(serde_yaml::from_str::<Stack>(yaml).is_err());
    }
}
