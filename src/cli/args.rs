//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_DEFINITION;

/// Overcast - declarative cloud stack provisioning.
#[derive(Debug, Parser)]
#[command(name = "overcast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show command output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision a deployment and run its steps
    Deploy(DeployArgs),

    /// List the images, flavors and networks a stack refers to
    ListRefs(ListRefsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `deploy` command.
#[derive(Debug, Clone, clap::Args)]
pub struct DeployArgs {
    /// Deployment definition file
    #[arg(long, env = "OVERCAST_CFG", default_value = DEFAULT_DEFINITION)]
    pub cfg: PathBuf,

    /// Prefix for every created resource name
    #[arg(long, env = "OVERCAST_PREFIX")]
    pub prefix: Option<String>,

    /// Resource mapping file (defaults to .overcast.mappings.yaml when present)
    #[arg(long, env = "OVERCAST_MAPPINGS")]
    pub mappings: Option<PathBuf>,

    /// Public key to upload as the run's keypair
    #[arg(long, env = "OVERCAST_KEY")]
    pub key: Option<PathBuf>,

    /// Provision against an in-memory backend and skip commands
    #[arg(long)]
    pub dry_run: bool,

    /// Deployment to perform
    pub name: String,
}

/// Arguments for the `list-refs` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ListRefsArgs {
    /// Print a mapping file template instead
    #[arg(long)]
    pub tmpl: bool,

    /// Stack description file
    pub stack: PathBuf,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
