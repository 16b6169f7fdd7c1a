//! Deployment orchestration.

pub mod pipeline;

pub use pipeline::{
    preflight, resolve_target, DeployPipeline, DeployProgress, PipelineOptions, PipelineReport,
    StepReport, KEYPAIR_BASE_NAME,
};
