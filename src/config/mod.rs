//! Configuration loading, parsing, and validation for Overcast.
//!
//! - Deployment definition schema in [`schema`]
//! - Resource mapping tables and templates in [`mappings`]
//! - Duration strings in [`duration`]
//! - File loading in [`loader`]
//! - Pre-flight validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use overcast::config::{DeploymentConfig, Step};
//!
//! let yaml = "demo:\n  - shell: { cmd: 'echo hi', timeout: 10s }\n";
//! let config: DeploymentConfig = serde_yaml::from_str(yaml).unwrap();
//! let steps = config.deployment("demo").unwrap();
//! assert!(matches!(steps[0], Step::Shell(_)));
//! ```

pub mod duration;
pub mod loader;
pub mod mappings;
pub mod schema;
pub mod validator;

pub use duration::parse_duration;
pub use loader::{
    load_definition, load_mappings, load_stack, read_text, resolve_relative, DEFAULT_DEFINITION,
    DEFAULT_MAPPINGS,
};
pub use mappings::{render_template, ResourceMapping, MISSING_VALUE};
pub use schema::{DeploymentConfig, ProvisionStep, ShellStep, Step, TargetType};
pub use validator::{
    into_result, validate_mapping, validate_shell_step, validate_stack, ValidationError,
};
