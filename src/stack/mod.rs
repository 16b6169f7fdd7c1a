//! Stack model and weak reference resolution.
//!
//! - [`Stack`] and friends - the declarative stack description
//! - [`resolve`] - find the symbols a deploy needs from the mapping file

pub mod resolver;
pub mod schema;

pub use resolver::{format_refs, resolve, WeakRefs};
pub use schema::{NetworkSpec, NicSpec, NodeSpec, RuleSpec, Stack};
