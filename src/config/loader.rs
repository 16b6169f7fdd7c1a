//! Configuration file loading.
//!
//! Definition files, stacks and mapping files are all YAML. Missing files
//! surface as [`OvercastError::ConfigNotFound`], malformed ones as
//! [`OvercastError::ConfigParseError`] carrying the offending path.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::mappings::ResourceMapping;
use crate::config::schema::DeploymentConfig;
use crate::error::{OvercastError, Result};
use crate::stack::Stack;

/// Default deployment definition file name.
pub const DEFAULT_DEFINITION: &str = ".overcast.yaml";

/// Default mapping file name.
pub const DEFAULT_MAPPINGS: &str = ".overcast.mappings.yaml";

/// Read a text file, mapping "not found" to `ConfigNotFound`.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OvercastError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            OvercastError::Io(e)
        }
    })
}

/// Parse YAML content.
///
/// # Arguments
///
/// * `content` - The YAML content to parse
/// * `source_path` - Path for error reporting
pub fn parse_yaml<T: DeserializeOwned>(content: &str, source_path: &Path) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| OvercastError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text(path)?;
    tracing::debug!("Loaded {}", path.display());
    parse_yaml(&content, path)
}

/// Load a deployment definition file.
pub fn load_definition(path: &Path) -> Result<DeploymentConfig> {
    load_yaml(path)
}

/// Load a stack description.
pub fn load_stack(path: &Path) -> Result<Stack> {
    load_yaml(path)
}

/// Load a mapping file, or empty tables when no file is given.
pub fn load_mappings(path: Option<&Path>) -> Result<ResourceMapping> {
    match path {
        Some(p) => load_yaml(p),
        None => Ok(ResourceMapping::default()),
    }
}

/// Resolve a path written in a definition file against that file's directory.
pub fn resolve_relative(base_file: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match base_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
