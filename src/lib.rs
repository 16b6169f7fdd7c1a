//! Overcast - declarative cloud stack provisioning.
//!
//! Overcast reads a stack description (networks, security groups and
//! nodes), creates it on a cloud backend in dependency order, and then
//! runs command steps locally or on the new nodes under per-step deadline
//! and retry policies.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`cloud`] - Backend capability trait and its adapters
//! - [`config`] - Definition, stack and mapping files, plus validation
//! - [`error`] - Error types and result aliases
//! - [`provision`] - Dependency-ordered resource creation
//! - [`runner`] - Deployment pipeline
//! - [`shell`] - Local and remote command processes
//! - [`stack`] - Stack model and weak-reference resolution
//! - [`steps`] - Bounded retry/deadline execution of commands
//! - [`ui`] - Spinners and terminal output
//!
//! # Example
//!
//! ```
//! use overcast::cloud::MemoryBackend;
//! use overcast::config::ResourceMapping;
//! use overcast::provision::{ProvisionOptions, Sequencer};
//! use overcast::stack::Stack;
//!
//! let stack: Stack = serde_yaml::from_str(r#"
//! networks:
//!   lan:
//!     cidr: 10.0.0.0/24
//! nodes:
//!   web:
//!     image: ubuntu
//!     flavor: small
//!     disk: 10
//!     nics:
//!       - network: lan
//! "#).unwrap();
//!
//! let backend = MemoryBackend::new();
//! let mapping = ResourceMapping::default();
//! let options = ProvisionOptions::default();
//! let bindings = Sequencer::new(&backend, &mapping, &options).run(&stack).unwrap();
//! assert!(bindings.node("web").is_some());
//! ```

pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod provision;
pub mod runner;
pub mod shell;
pub mod stack;
pub mod steps;
pub mod ui;

pub use error::{OvercastError, Result};
