//! Per-run resource bindings.

use serde::Serialize;
use std::collections::BTreeMap;

/// Backend ids created during one deployment run, keyed by base name.
///
/// Keys are always the names declared in the stack, never the prefixed
/// names the backend sees. Nothing here outlives the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeBindings {
    pub networks: BTreeMap<String, String>,
    pub security_groups: BTreeMap<String, String>,
    pub nodes: BTreeMap<String, String>,
}

impl RuntimeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self, base_name: &str) -> Option<&str> {
        self.networks.get(base_name).map(String::as_str)
    }

    pub fn security_group(&self, base_name: &str) -> Option<&str> {
        self.security_groups.get(base_name).map(String::as_str)
    }

    pub fn node(&self, base_name: &str) -> Option<&str> {
        self.nodes.get(base_name).map(String::as_str)
    }

    /// Total number of bound resources.
    pub fn len(&self) -> usize {
        self.networks.len() + self.security_groups.len() + self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
