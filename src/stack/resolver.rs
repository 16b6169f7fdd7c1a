//! Weak reference discovery.
//!
//! A weak reference is an image, flavor or network symbol that must resolve
//! outside the stack (through the mapping file, or as a raw backend id)
//! before the stack can be deployed. Networks the stack declares itself are
//! created during the run and are never weak.

use std::collections::BTreeSet;

use super::schema::Stack;

/// Symbols an operator must be able to resolve before a deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeakRefs {
    pub images: BTreeSet<String>,
    pub flavors: BTreeSet<String>,
    pub networks: BTreeSet<String>,
}

impl WeakRefs {
    /// True when the stack references nothing external.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.flavors.is_empty() && self.networks.is_empty()
    }
}

/// Collect the weak references of a stack.
pub fn resolve(stack: &Stack) -> WeakRefs {
    let mut refs = WeakRefs::default();

    for node in stack.nodes.values() {
        refs.images.insert(node.image.clone());
        refs.flavors.insert(node.flavor.clone());
        refs.networks
            .extend(node.nics.iter().map(|nic| nic.network.clone()));
    }

    refs.networks.retain(|name| !stack.is_dynamic_network(name));
    refs
}

/// Human-readable listing used by `overcast list-refs`.
pub fn format_refs(refs: &WeakRefs) -> String {
    fn section(title: &str, items: &BTreeSet<String>) -> String {
        let body = if items.is_empty() {
            "None".to_string()
        } else {
            items.iter().cloned().collect::<Vec<_>>().join("  ")
        };
        format!("{}:\n  {}\n", title, body)
    }

    [
        section("Images", &refs.images),
        section("Flavors", &refs.flavors),
        section("Networks", &refs.networks),
    ]
    .join("\n")
}
