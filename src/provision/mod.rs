//! Stack provisioning.
//!
//! - [`Sequencer`] - creates networks, security groups and nodes, in that order
//! - [`RuntimeBindings`] - base name → backend id tables for one run

pub mod bindings;
pub mod sequencer;

pub use bindings::RuntimeBindings;
pub use sequencer::{
    prefixed_name, resolve_network, NetworkSource, ProvisionOptions, Sequencer,
};
