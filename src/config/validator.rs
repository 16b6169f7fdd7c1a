//! Pre-flight validation rules.
//!
//! Everything here runs before the first backend call:
//! - Stack resources must be well formed
//! - Shell steps must have a command, and remote steps a known node
//! - Mapping files must not contain unfilled template placeholders

use std::collections::BTreeSet;

use crate::config::mappings::ResourceMapping;
use crate::config::schema::{ShellStep, TargetType};
use crate::error::{OvercastError, Result};
use crate::stack::Stack;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(rule: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
        }
    }
}

/// Validate a stack description.
///
/// Collects every problem rather than stopping at the first one.
pub fn validate_stack(label: &str, stack: &Stack) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (name, network) in &stack.networks {
        if network.cidr.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-cidr",
                format!("{}: network '{}' has an empty cidr", label, name),
            ));
        }
    }

    for (name, rules) in &stack.securitygroups {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.from_port > rule.to_port {
                errors.push(ValidationError::new(
                    "invalid-port-range",
                    format!(
                        "{}: security group '{}' rule {} has from_port {} > to_port {}",
                        label, name, idx, rule.from_port, rule.to_port
                    ),
                ));
            }
            if rule.protocol.trim().is_empty() {
                errors.push(ValidationError::new(
                    "empty-protocol",
                    format!(
                        "{}: security group '{}' rule {} has no protocol",
                        label, name, idx
                    ),
                ));
            }
        }
    }

    for (name, node) in &stack.nodes {
        if node.image.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-image",
                format!("{}: node '{}' has an empty image", label, name),
            ));
        }
        if node.flavor.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-flavor",
                format!("{}: node '{}' has an empty flavor", label, name),
            ));
        }
        if node.disk == 0 {
            errors.push(ValidationError::new(
                "zero-disk",
                format!("{}: node '{}' requests a 0 GB disk", label, name),
            ));
        }
        for (idx, nic) in node.nics.iter().enumerate() {
            if nic.network.trim().is_empty() {
                errors.push(ValidationError::new(
                    "empty-network",
                    format!("{}: node '{}' nic {} has no network", label, name, idx),
                ));
            }
        }
    }

    errors
}

/// Validate a shell step.
///
/// `known_nodes` holds the nodes declared by provision steps that run
/// before this one.
pub fn validate_shell_step(
    label: &str,
    step: &ShellStep,
    known_nodes: &BTreeSet<String>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if step.cmd.trim().is_empty() {
        errors.push(ValidationError::new(
            "empty-command",
            format!("{}: command is empty", label),
        ));
    }

    if step.target == TargetType::Remote {
        match &step.node {
            None => errors.push(ValidationError::new(
                "missing-node",
                format!("{}: remote step needs a 'node'", label),
            )),
            Some(node) if !known_nodes.contains(node) => errors.push(ValidationError::new(
                "unknown-node",
                format!(
                    "{}: node '{}' is not provisioned by an earlier step",
                    label, node
                ),
            )),
            Some(_) => {}
        }
    }

    errors
}

/// Reject mapping files that still contain template placeholders.
pub fn validate_mapping(mapping: &ResourceMapping) -> Vec<ValidationError> {
    mapping
        .placeholders()
        .into_iter()
        .map(|(section, symbol)| {
            ValidationError::new(
                "placeholder-value",
                format!(
                    "mapping for {} '{}' still holds the template placeholder",
                    section, symbol
                ),
            )
        })
        .collect()
}

/// Fold collected errors into a single `Validation` error.
pub fn into_result(errors: Vec<ValidationError>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| format!("[{}] {}", e.rule, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(OvercastError::Validation { message })
}
