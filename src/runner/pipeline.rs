//! Deployment execution.
//!
//! A deployment runs in two phases. Preparation loads every stack and
//! userdata file the steps reference, reads the public key and validates
//! everything; no backend call happens before it succeeds. Execution then
//! walks the steps in order, threading one set of [`RuntimeBindings`]
//! through all provision steps, and stops at the first error.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info};

use crate::cloud::CloudBackend;
use crate::config::{
    into_result, load_stack, read_text, resolve_relative, validate_mapping, validate_shell_step,
    validate_stack, DeploymentConfig, ResourceMapping, ShellStep, Step, TargetType,
};
use crate::error::{OvercastError, Result};
use crate::provision::{prefixed_name, ProvisionOptions, RuntimeBindings, Sequencer};
use crate::shell::{ChildOutput, CommandTarget, ProcessRunner};
use crate::stack::Stack;
use crate::steps::{ExecState, ExecutionReport, StepExecutor};

/// Base name of the per-run keypair.
pub const KEYPAIR_BASE_NAME: &str = "pubkey";

/// Options for a deployment run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Name prefix for every created resource.
    pub prefix: Option<String>,
    /// Public key uploaded as the run's keypair.
    pub key_path: Option<PathBuf>,
    /// Definition file; relative stack and userdata paths resolve against
    /// its directory.
    pub definition_path: PathBuf,
    /// Provision against the given backend but do not run commands.
    pub dry_run: bool,
    /// Where command output goes.
    pub output: ChildOutput,
}

/// Progress events emitted during a deployment.
#[derive(Debug)]
pub enum DeployProgress<'a> {
    /// A step is about to start.
    StepStarting {
        label: &'a str,
        index: usize,
        total: usize,
    },
    /// The run's keypair was uploaded.
    KeypairCreated { name: &'a str },
    /// A step finished successfully.
    StepFinished { report: &'a StepReport },
}

/// Outcome of one step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub label: String,
    pub kind: &'static str,
    /// Set for command steps that a dry run did not execute.
    pub skipped: bool,
    pub execution: ExecutionReport,
}

impl StepReport {
    /// Label plus timing, without a status icon.
    pub fn detail(&self) -> String {
        if self.skipped {
            format!("{} (skipped)", self.label)
        } else {
            self.execution.detail(&self.label)
        }
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let icon = if self.skipped {
            ExecState::Idle.display_char()
        } else {
            self.execution.state.display_char()
        };
        format!("{} {}", icon, self.detail())
    }
}

/// Result of a deployment.
#[derive(Debug)]
pub struct PipelineReport {
    pub deployment: String,
    pub steps: Vec<StepReport>,
    /// Everything created during the run.
    pub bindings: RuntimeBindings,
    pub duration: Duration,
}

enum PreparedStep<'c> {
    Provision {
        label: String,
        stack: Stack,
        userdata: Option<String>,
    },
    Shell {
        label: String,
        step: &'c ShellStep,
    },
}

impl PreparedStep<'_> {
    fn label(&self) -> &str {
        match self {
            PreparedStep::Provision { label, .. } | PreparedStep::Shell { label, .. } => label,
        }
    }
}

struct Prepared<'c> {
    steps: Vec<PreparedStep<'c>>,
    public_key: Option<String>,
}

/// Runs a named deployment against a backend.
pub struct DeployPipeline<'a> {
    backend: &'a dyn CloudBackend,
    options: PipelineOptions,
}

impl<'a> DeployPipeline<'a> {
    pub fn new(backend: &'a dyn CloudBackend, options: PipelineOptions) -> Self {
        Self { backend, options }
    }

    /// Run the named deployment.
    pub fn run(
        &self,
        name: &str,
        config: &DeploymentConfig,
        mapping: &ResourceMapping,
    ) -> Result<PipelineReport> {
        self.run_with_progress(name, config, mapping, |_| {})
    }

    /// Run the named deployment with a progress callback.
    pub fn run_with_progress(
        &self,
        name: &str,
        config: &DeploymentConfig,
        mapping: &ResourceMapping,
        mut on_progress: impl FnMut(DeployProgress<'_>),
    ) -> Result<PipelineReport> {
        let start = Instant::now();
        let prepared = prepare(&self.options, name, config, mapping)?;
        let total = prepared.steps.len();
        info!("Running deployment '{}' ({} step(s))", name, total);

        let mut bindings = RuntimeBindings::new();
        let mut keypair: Option<String> = None;
        let mut reports = Vec::with_capacity(total);

        for (index, step) in prepared.steps.iter().enumerate() {
            on_progress(DeployProgress::StepStarting {
                label: step.label(),
                index,
                total,
            });

            let report = match step {
                PreparedStep::Provision {
                    label,
                    stack,
                    userdata,
                } => {
                    if keypair.is_none() {
                        if let Some(public_key) = &prepared.public_key {
                            let key_name =
                                prefixed_name(self.options.prefix.as_deref(), KEYPAIR_BASE_NAME);
                            self.backend.create_keypair(&key_name, public_key)?;
                            info!("Created keypair {}", key_name);
                            on_progress(DeployProgress::KeypairCreated { name: &key_name });
                            keypair = Some(key_name);
                        }
                    }
                    self.provision(
                        label,
                        stack,
                        userdata.clone(),
                        keypair.clone(),
                        mapping,
                        &mut bindings,
                    )?
                }
                PreparedStep::Shell { label, step } => self.shell(label, step, &bindings)?,
            };

            on_progress(DeployProgress::StepFinished { report: &report });
            reports.push(report);
        }

        Ok(PipelineReport {
            deployment: name.to_string(),
            steps: reports,
            bindings,
            duration: start.elapsed(),
        })
    }

    fn provision(
        &self,
        label: &str,
        stack: &Stack,
        userdata: Option<String>,
        keypair: Option<String>,
        mapping: &ResourceMapping,
        bindings: &mut RuntimeBindings,
    ) -> Result<StepReport> {
        let started = Instant::now();
        let options = ProvisionOptions {
            prefix: self.options.prefix.clone(),
            keypair,
            userdata,
        };
        Sequencer::new(self.backend, mapping, &options).run_into(stack, bindings)?;

        Ok(StepReport {
            label: label.to_string(),
            kind: "provision",
            skipped: false,
            execution: ExecutionReport {
                attempts: 1,
                duration: started.elapsed(),
                state: ExecState::Succeeded,
            },
        })
    }

    fn shell(
        &self,
        label: &str,
        step: &ShellStep,
        bindings: &RuntimeBindings,
    ) -> Result<StepReport> {
        if self.options.dry_run {
            // Dry-run nodes have no addresses to connect to.
            let node = step.node.as_deref().unwrap_or("local");
            info!("Dry run: not running {} on {}", step.cmd, node);
            return Ok(StepReport {
                label: label.to_string(),
                kind: "shell",
                skipped: true,
                execution: ExecutionReport {
                    attempts: 0,
                    duration: Duration::ZERO,
                    state: ExecState::Idle,
                },
            });
        }

        let target = resolve_target(step, bindings, self.backend)?;
        debug!("Running {} on {}", label, target);
        let runner = ProcessRunner::new(target)
            .with_env(step.env.clone())
            .with_output(self.options.output);
        let execution = StepExecutor::new(runner).execute(&step.cmd, &step.policy())?;

        Ok(StepReport {
            label: label.to_string(),
            kind: "shell",
            skipped: false,
            execution,
        })
    }
}

/// Load and validate a deployment without touching any backend.
///
/// Returns the number of steps the deployment would run.
pub fn preflight(
    options: &PipelineOptions,
    name: &str,
    config: &DeploymentConfig,
    mapping: &ResourceMapping,
) -> Result<usize> {
    Ok(prepare(options, name, config, mapping)?.steps.len())
}

/// Load and validate everything a deployment needs.
fn prepare<'c>(
    options: &PipelineOptions,
    name: &str,
    config: &'c DeploymentConfig,
    mapping: &ResourceMapping,
) -> Result<Prepared<'c>> {
    let steps = config.deployment(name).ok_or_else(|| {
        let known: Vec<&str> = config.deployments.keys().map(String::as_str).collect();
        OvercastError::validation(format!(
            "unknown deployment '{}' (defined: {})",
            name,
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        ))
    })?;

    let mut errors = validate_mapping(mapping);
    let mut known_nodes = BTreeSet::new();
    let mut prepared = Vec::with_capacity(steps.len());

    for step in steps {
        let label = step.label();
        match step {
            Step::Provision(provision) => {
                let path = resolve_relative(&options.definition_path, &provision.stack);
                let stack = load_stack(&path)?;
                errors.extend(validate_stack(&label, &stack));
                known_nodes.extend(stack.nodes.keys().cloned());

                let userdata = match &provision.userdata {
                    Some(p) => Some(read_text(&resolve_relative(
                        &options.definition_path,
                        p,
                    ))?),
                    None => None,
                };
                prepared.push(PreparedStep::Provision {
                    label,
                    stack,
                    userdata,
                });
            }
            Step::Shell(shell) => {
                errors.extend(validate_shell_step(&label, shell, &known_nodes));
                prepared.push(PreparedStep::Shell { label, step: shell });
            }
        }
    }

    into_result(errors)?;

    let provisions = steps.iter().any(|s| matches!(s, Step::Provision(_)));
    let public_key = match &options.key_path {
        Some(path) if provisions => Some(read_text(path)?.trim().to_string()),
        _ => None,
    };

    debug!("Prepared {} step(s) for '{}'", prepared.len(), name);
    Ok(Prepared {
        steps: prepared,
        public_key,
    })
}

/// Where a command step runs.
///
/// Remote steps look up the node's id in `bindings` and ask the backend
/// for its address.
pub fn resolve_target(
    step: &ShellStep,
    bindings: &RuntimeBindings,
    backend: &dyn CloudBackend,
) -> Result<CommandTarget> {
    if step.target == TargetType::Local {
        return Ok(CommandTarget::Local);
    }

    let node = step
        .node
        .as_deref()
        .ok_or_else(|| OvercastError::validation("remote step needs a 'node'"))?;
    let id = bindings.node(node).ok_or_else(|| {
        OvercastError::validation(format!("node '{}' has not been provisioned", node))
    })?;
    let address = backend
        .node_address(id)?
        .ok_or_else(|| anyhow!("node '{}' ({}) has no address yet", node, id))?;

    debug!("Node {} ({}) is at {}", node, id, address);
    Ok(CommandTarget::remote(step.user.as_deref(), &address))
}
