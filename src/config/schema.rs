//! Deployment definition schema.
//!
//! A definition file maps deployment names to an ordered list of steps.
//! Each step is a single-key record whose key selects the handler:
//!
//! ```yaml
//! staging:
//!   - provision:
//!       stack: stack.yaml
//!       userdata: cloud-init.txt
//!   - shell:
//!       cmd: ./bootstrap.sh
//!       type: remote
//!       node: web
//!       timeout: 30s
//!       total-timeout: 5m
//!       retry-delay: 10s
//!       retry-if-fails: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use super::duration;
use crate::steps::StepPolicy;

/// Root of a deployment definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentConfig {
    pub deployments: BTreeMap<String, Vec<Step>>,
}

impl DeploymentConfig {
    /// Steps of a named deployment.
    pub fn deployment(&self, name: &str) -> Option<&[Step]> {
        self.deployments.get(name).map(Vec::as_slice)
    }
}

/// One unit of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Create the resources of a stack.
    Provision(ProvisionStep),

    /// Run a command under a deadline/retry policy.
    #[serde(alias = "execute")]
    Shell(ShellStep),
}

impl Step {
    /// Handler name, as written in the definition.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Provision(_) => "provision",
            Step::Shell(_) => "shell",
        }
    }

    /// Short label for progress output.
    pub fn label(&self) -> String {
        match self {
            Step::Provision(p) => format!("provision {}", p.stack.display()),
            Step::Shell(s) => match s.target {
                TargetType::Local => format!("shell {}", first_line(&s.cmd)),
                TargetType::Remote => format!(
                    "shell@{} {}",
                    s.node.as_deref().unwrap_or("?"),
                    first_line(&s.cmd)
                ),
            },
        }
    }
}

fn first_line(cmd: &str) -> &str {
    cmd.lines().next().unwrap_or("").trim()
}

/// Parameters of a `provision` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionStep {
    /// Stack file, relative to the definition file.
    pub stack: PathBuf,

    /// User data file passed to every node of the stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdata: Option<PathBuf>,
}

/// Where a shell step runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[default]
    Local,
    Remote,
}

/// Parameters of a `shell` (or `execute`) step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShellStep {
    /// Command text, fed to the shell on stdin.
    pub cmd: String,

    #[serde(default, rename = "type")]
    pub target: TargetType,

    /// Node name for remote steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// SSH login for remote steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Deadline for each attempt.
    #[serde(
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing
    )]
    pub timeout: Option<Duration>,

    /// Deadline for all attempts together.
    #[serde(
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing
    )]
    pub total_timeout: Option<Duration>,

    /// Pause between attempts.
    #[serde(
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing
    )]
    pub retry_delay: Option<Duration>,

    #[serde(default)]
    pub retry_if_fails: bool,

    /// Extra environment for the command.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl ShellStep {
    /// A local step with no deadlines and no retries.
    pub fn local(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            target: TargetType::Local,
            node: None,
            user: None,
            timeout: None,
            total_timeout: None,
            retry_delay: None,
            retry_if_fails: false,
            env: HashMap::new(),
        }
    }

    /// The retry/deadline policy this step declares.
    pub fn policy(&self) -> StepPolicy {
        StepPolicy {
            total_timeout: self.total_timeout,
            per_attempt_timeout: self.timeout,
            retry_delay: self.retry_delay.unwrap_or(Duration::ZERO),
            retry_on_failure: self.retry_if_fails,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"
staging:
  - provision:
      stack: stack.yaml
      userdata: cloud-init.txt
  - shell:
      cmd: make test
      timeout: 30s
      total-timeout: 2m
      retry-delay: 5
      retry-if-fails: true
  - execute:
      cmd: apt-get update
      type: remote
      node: web
      user: admin
      env:
        DEBIAN_FRONTEND: noninteractive
"#;

    #[test]
    fn parses_ordered_steps() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        let steps = config.deployment("staging").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].kind(), "provision");
        assert_eq!(steps[1].kind(), "shell");
        assert_eq!(steps[2].kind(), "shell");
    }

    #[test]
    fn provision_step_fields() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        match &config.deployment("staging").unwrap()[0] {
            Step::Provision(p) => {
                assert_eq!(p.stack, PathBuf::from("stack.yaml"));
                assert_eq!(p.userdata, Some(PathBuf::from("cloud-init.txt")));
            }
            other => panic!("expected provision, got {:?}", other),
        }
    }

    #[test]
    fn shell_step_durations_and_policy() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        let Step::Shell(shell) = &config.deployment("staging").unwrap()[1] else {
            panic!("expected shell step");
        };
        assert_eq!(shell.target, TargetType::Local);

        let policy = shell.policy();
        assert_eq!(policy.per_attempt_timeout, Some(Duration::from_secs(30)));
        assert_eq!(policy.total_timeout, Some(Duration::from_secs(120)));
        assert_eq!(policy.retry_delay, Duration::from_secs(5));
        assert!(policy.retry_on_failure);
    }

    #[test]
    fn execute_is_alias_for_shell() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        let Step::Shell(shell) = &config.deployment("staging").unwrap()[2] else {
            panic!("expected shell step");
        };
        assert_eq!(shell.target, TargetType::Remote);
        assert_eq!(shell.node.as_deref(), Some("web"));
        assert_eq!(shell.user.as_deref(), Some("admin"));
        assert_eq!(shell.env["DEBIAN_FRONTEND"], "noninteractive");
    }

    #[test]
    fn defaults_for_bare_shell_step() {
        let step: Step = serde_yaml::from_str("shell: { cmd: 'true' }").unwrap();
        let Step::Shell(shell) = step else {
            panic!("expected shell step");
        };
        assert_eq!(shell, ShellStep::local("true"));
        let policy = shell.policy();
        assert_eq!(policy.retry_delay, Duration::ZERO);
        assert!(!policy.retry_on_failure);
        assert!(policy.total_timeout.is_none());
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        assert!(serde_yaml::from_str::<Step>("reboot: { node: web }").is_err());
    }

    #[test]
    fn unknown_deployment_is_none() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        assert!(config.deployment("production").is_none());
    }

    #[test]
    fn step_labels() {
        let config: DeploymentConfig = serde_yaml::from_str(DEFINITION).unwrap();
        let steps = config.deployment("staging").unwrap();
        assert_eq!(steps[0].label(), "provision stack.yaml");
        assert_eq!(steps[1].label(), "shell make test");
        assert_eq!(steps[2].label(), "shell@web apt-get update");
    }
}
