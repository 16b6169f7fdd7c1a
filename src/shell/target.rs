//! Where a command step runs.

use std::fmt;

/// Default SSH login for remote steps.
pub const DEFAULT_REMOTE_USER: &str = "ubuntu";

/// Local shell, or a shell on a provisioned node over SSH.
///
/// Either way the command text is fed on stdin to `bash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    Local,
    Remote { user: String, address: String },
}

impl CommandTarget {
    /// Remote target with the default user when none is given.
    pub fn remote(user: Option<&str>, address: &str) -> Self {
        CommandTarget::Remote {
            user: user.unwrap_or(DEFAULT_REMOTE_USER).to_string(),
            address: address.to_string(),
        }
    }

    /// Program and arguments that start the shell.
    pub fn program(&self) -> (&'static str, Vec<String>) {
        match self {
            CommandTarget::Local => ("bash", Vec::new()),
            CommandTarget::Remote { user, address } => (
                "ssh",
                vec![
                    "-o".to_string(),
                    "StrictHostKeyChecking=no".to_string(),
                    "-o".to_string(),
                    "BatchMode=yes".to_string(),
                    format!("{}@{}", user, address),
                    "bash".to_string(),
                ],
            ),
        }
    }
}

impl fmt::Display for CommandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandTarget::Local => write!(f, "local"),
            CommandTarget::Remote { user, address } => write!(f, "{}@{}", user, address),
        }
    }
}
