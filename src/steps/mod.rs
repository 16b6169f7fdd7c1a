//! Bounded command execution.
//!
//! This module provides the retry/deadline engine behind command steps:
//!
//! - [`StepPolicy`] - timeouts, retry delay and retry switch of a step
//! - [`StepExecutor`] - runs attempts until success or the policy gives up
//! - [`AttemptRunner`] - runs a single attempt (see [`crate::shell::ProcessRunner`])
//! - [`ExecState`] - state of a step while it runs
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use overcast::shell::{CommandTarget, ProcessRunner};
//! use overcast::steps::{StepExecutor, StepPolicy};
//!
//! let policy = StepPolicy {
//!     total_timeout: Some(Duration::from_secs(12)),
//!     per_attempt_timeout: Some(Duration::from_secs(5)),
//!     retry_delay: Duration::from_secs(2),
//!     retry_on_failure: true,
//! };
//!
//! let mut executor = StepExecutor::new(ProcessRunner::new(CommandTarget::Local));
//! match executor.execute("curl -sf http://localhost:8080/health", &policy) {
//!     Ok(report) => println!("{}", report.summary_line("health check")),
//!     Err(e) => eprintln!("gave up: {}", e),
//! }
//! ```

pub mod executor;
pub mod outcome;
pub mod policy;

pub use executor::{
    format_duration, AttemptRunner, Clock, ExecutionReport, StepExecutor, SystemClock,
};
pub use outcome::{AttemptOutcome, ExecState};
pub use policy::{RetryDecision, StepPolicy};
