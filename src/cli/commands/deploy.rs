//! Deploy command implementation.
//!
//! The `overcast deploy` command provisions a named deployment and runs
//! its command steps.

use std::path::{Path, PathBuf};

use crate::cli::args::DeployArgs;
use crate::cloud::{CloudBackend, MemoryBackend, OpenStackBackend, OpenStackCredentials};
use crate::config::{
    load_definition, load_mappings, resolve_relative, ResourceMapping, DEFAULT_MAPPINGS,
};
use crate::error::{OvercastError, Result};
use crate::provision::RuntimeBindings;
use crate::runner::{preflight, DeployPipeline, DeployProgress, PipelineOptions};
use crate::steps::format_duration;
use crate::ui::{OutputMode, SpinnerHandle, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// The deploy command implementation.
pub struct DeployCommand {
    args: DeployArgs,
}

impl DeployCommand {
    /// Create a new deploy command.
    pub fn new(args: DeployArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &DeployArgs {
        &self.args
    }

    /// Mapping file to load: `--mappings`, else the default file next to
    /// the definition when it exists.
    fn mapping_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.args.mappings {
            return Some(path.clone());
        }
        let default = resolve_relative(&self.args.cfg, Path::new(DEFAULT_MAPPINGS));
        default.is_file().then_some(default)
    }

    fn build_options(&self, mode: OutputMode) -> PipelineOptions {
        PipelineOptions {
            prefix: self.args.prefix.clone(),
            key_path: self.args.key.clone(),
            definition_path: self.args.cfg.clone(),
            dry_run: self.args.dry_run,
            output: mode.child_output(),
        }
    }

    fn load_mapping(&self, ui: &mut dyn UserInterface) -> Result<ResourceMapping> {
        let path = self.mapping_path();
        if let Some(p) = &path {
            if ui.output_mode() == OutputMode::Verbose {
                ui.message(&format!("Mappings: {}", p.display()));
            }
        }
        load_mappings(path.as_deref())
    }
}

impl Command for DeployCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = match load_definition(&self.args.cfg) {
            Ok(c) => c,
            Err(OvercastError::ConfigNotFound { path }) => {
                ui.error(&format!(
                    "No deployment definition at {}. Pass one with --cfg.",
                    path.display()
                ));
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };
        let mapping = self.load_mapping(ui)?;
        let options = self.build_options(ui.output_mode());
        let name = self.args.name.as_str();

        let total = preflight(&options, name, &config, &mapping)?;
        ui.show_header(&format!("Deploying {} ({} steps)", name, total));
        if self.args.dry_run {
            ui.message("Running in dry-run mode - provisioning in memory, no commands run");
        }

        let memory;
        let openstack;
        let backend: &dyn CloudBackend = if self.args.dry_run {
            memory = MemoryBackend::new();
            &memory
        } else {
            let creds = OpenStackCredentials::from_env()?;
            openstack = OpenStackBackend::connect(&creds)?;
            &openstack
        };

        let pipeline = DeployPipeline::new(backend, options);
        let mut current: Option<(String, Box<dyn SpinnerHandle>)> = None;

        let result = pipeline.run_with_progress(name, &config, &mapping, |progress| match progress {
            DeployProgress::StepStarting {
                label,
                index,
                total,
            } => {
                let spinner = ui.start_spinner(&format!("[{}/{}] {}", index + 1, total, label));
                current = Some((label.to_string(), spinner));
            }
            DeployProgress::KeypairCreated { name } => {
                if let Some((_, spinner)) = current.as_mut() {
                    spinner.set_message(&format!("Uploaded keypair {}", name));
                }
            }
            DeployProgress::StepFinished { report } => {
                if let Some((_, mut spinner)) = current.take() {
                    if report.skipped {
                        spinner.finish_skipped(&report.detail());
                    } else {
                        spinner.finish_success(&report.detail());
                    }
                }
            }
        });

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                if let Some((label, mut spinner)) = current.take() {
                    spinner.finish_error(&format!("{} failed", label));
                }
                if let Some(rest) = e.remaining_input().filter(|r| !r.trim().is_empty()) {
                    ui.warning(&format!("Input not consumed by the command:\n{}", rest));
                }
                return Err(e);
            }
        };

        show_bindings(ui, &report.bindings);
        ui.success(&format!(
            "Deployed {} ({} steps, {})",
            report.deployment,
            report.steps.len(),
            format_duration(report.duration)
        ));
        Ok(CommandResult::success())
    }
}

fn show_bindings(ui: &mut dyn UserInterface, bindings: &RuntimeBindings) {
    if bindings.is_empty() || ui.output_mode() != OutputMode::Verbose {
        return;
    }
    for (kind, table) in [
        ("network", &bindings.networks),
        ("security group", &bindings.security_groups),
        ("node", &bindings.nodes),
    ] {
        for (base, id) in table {
            ui.message(&format!("  {} {} -> {}", kind, base, id));
        }
    }
}
