//! Shell processes for command steps.
//!
//! - [`CommandTarget`] - local `bash` or `bash` over SSH on a node
//! - [`ProcessRunner`] - one deadline-bounded attempt of a command

pub mod attempt;
pub mod target;

pub use attempt::{ChildOutput, ProcessRunner};
pub use target::{CommandTarget, DEFAULT_REMOTE_USER};
