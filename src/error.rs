//! Error types for Overcast operations.
//!
//! This module defines [`OvercastError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Validation problems surface as [`OvercastError::Validation`] before any
//!   backend call is made
//! - Backend failures wrap [`BackendError`] and are never retried
//! - Command failures and timeouts are reported only after the step's retry
//!   policy is exhausted
//! - Use `anyhow::Error` (via `OvercastError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

use crate::cloud::BackendError;

/// Core error type for Overcast operations.
#[derive(Debug, Error)]
pub enum OvercastError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a definition, stack, or mapping file.
    #[error("Failed to parse {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Malformed stack or deployment definition.
    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    /// A cloud backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Command exited non-zero and the retry policy gave up.
    #[error("Command failed after {attempts} attempt(s): {command}")]
    CommandFailed {
        command: String,
        remaining_input: String,
        attempts: u32,
    },

    /// Command ran past its deadline and the retry policy gave up.
    #[error("Command timed out after {attempts} attempt(s): {command}")]
    CommandTimedOut {
        command: String,
        remaining_input: String,
        attempts: u32,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OvercastError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The stdin text the command never consumed, for command errors.
    pub fn remaining_input(&self) -> Option<&str> {
        match self {
            Self::CommandFailed {
                remaining_input, ..
            }
            | Self::CommandTimedOut {
                remaining_input, ..
            } => Some(remaining_input),
            _ => None,
        }
    }
}

/// Result type alias for Overcast operations.
pub type Result<T> = std::result::Result<T, OvercastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = OvercastError::ConfigNotFound {
            path: PathBuf::from("/foo/.overcast.yaml"),
        };
        assert!(err.to_string().contains("/foo/.overcast.yaml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = OvercastError::ConfigParseError {
            path: PathBuf::from("/stack.yaml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/stack.yaml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn validation_displays_message() {
        let err = OvercastError::validation("node 'web' has no nics");
        assert!(err.to_string().contains("node 'web' has no nics"));
    }

    #[test]
    fn backend_error_is_transparent() {
        let err: OvercastError = BackendError::new("create_network", 409, "conflict").into();
        let msg = err.to_string();
        assert!(msg.contains("create_network"));
        assert!(msg.contains("409"));
        assert!(matches!(err, OvercastError::Backend(_)));
    }

    #[test]
    fn command_failed_displays_attempts_and_command() {
        let err = OvercastError::CommandFailed {
            command: "make install".into(),
            remaining_input: String::new(),
            attempts: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("make install"));
        assert!(msg.contains("3 attempt"));
    }

    #[test]
    fn remaining_input_only_for_command_errors() {
        let err = OvercastError::CommandTimedOut {
            command: "sleep 10".into(),
            remaining_input: "echo tail\n".into(),
            attempts: 1,
        };
        assert_eq!(err.remaining_input(), Some("echo tail\n"));
        assert_eq!(OvercastError::validation("x").remaining_input(), None);
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: OvercastError = io_err.into();
        assert!(matches!(err, OvercastError::Io(_)));
    }
}
