//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`].

pub mod completions;
pub mod deploy;
pub mod dispatcher;
pub mod list_refs;

pub use completions::CompletionsCommand;
pub use deploy::DeployCommand;
pub use dispatcher::{Command, CommandDispatcher, CommandResult};
pub use list_refs::ListRefsCommand;
