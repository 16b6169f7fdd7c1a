//! Command-line interface for Overcast.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CompletionsArgs, DeployArgs, ListRefsArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
