//! Bounded command execution.
//!
//! [`StepExecutor`] runs one command as a sequence of attempts under a
//! [`StepPolicy`]. The overall deadline is fixed when the step starts;
//! retries never extend it. Attempts themselves are delegated to an
//! [`AttemptRunner`] and time is read through a [`Clock`], so the state
//! machine can be driven by a fake clock in tests.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{OvercastError, Result};

use super::outcome::{AttemptOutcome, ExecState};
use super::policy::{RetryDecision, StepPolicy};

/// Source of time for the executor.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Runs one attempt of a command.
pub trait AttemptRunner {
    /// Run `input` once, giving up at `deadline`.
    ///
    /// Errors are reserved for failures to run at all (e.g. spawn errors);
    /// they are not retried.
    fn run_attempt(&mut self, input: &str, deadline: Option<Instant>) -> Result<AttemptOutcome>;
}

impl<R: AttemptRunner + ?Sized> AttemptRunner for &mut R {
    fn run_attempt(&mut self, input: &str, deadline: Option<Instant>) -> Result<AttemptOutcome> {
        (**self).run_attempt(input, deadline)
    }
}

/// Summary of a successful command step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Wall time from the first attempt to success.
    pub duration: Duration,
    pub state: ExecState,
}

impl ExecutionReport {
    /// Label plus timing, without a status icon.
    pub fn detail(&self, label: &str) -> String {
        let retries = match self.attempts {
            0 | 1 => String::new(),
            n => format!(", {} attempts", n),
        };
        format!("{} ({}{})", label, format_duration(self.duration), retries)
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self, label: &str) -> String {
        format!("{} {}", self.state.display_char(), self.detail(label))
    }
}

/// Format a duration compactly.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Attempt loop for one command.
pub struct StepExecutor<R, C> {
    runner: R,
    clock: C,
}

impl<R: AttemptRunner> StepExecutor<R, SystemClock> {
    /// Executor on wall-clock time.
    pub fn new(runner: R) -> Self {
        Self::with_clock(runner, SystemClock)
    }
}

impl<R: AttemptRunner, C: Clock> StepExecutor<R, C> {
    pub fn with_clock(runner: R, clock: C) -> Self {
        Self { runner, clock }
    }

    /// Run `command` until it succeeds or the policy gives up.
    ///
    /// Returns `CommandFailed` or `CommandTimedOut` carrying the input the
    /// last attempt never consumed.
    pub fn execute(&mut self, command: &str, policy: &StepPolicy) -> Result<ExecutionReport> {
        let start = self.clock.now();
        let overall = policy.overall_deadline(start);
        let mut state = ExecState::Idle;
        let mut attempts: u32 = 0;

        loop {
            let now = self.clock.now();
            let deadline = policy.attempt_deadline(now, overall);
            attempts += 1;
            state = transition(state, ExecState::Running, attempts);

            let outcome = self.runner.run_attempt(command, deadline)?;
            state = transition(state, outcome.state(), attempts);

            if outcome == AttemptOutcome::Succeeded {
                let duration = self.clock.now().saturating_duration_since(start);
                info!(
                    "Command succeeded after {} attempt(s) in {}",
                    attempts,
                    format_duration(duration)
                );
                return Ok(ExecutionReport {
                    attempts,
                    duration,
                    state,
                });
            }

            match policy.decide(&outcome, self.clock.now(), overall) {
                RetryDecision::Retry => {
                    warn!(
                        "Attempt {} {}; retrying in {}",
                        attempts,
                        state,
                        format_duration(policy.retry_delay)
                    );
                    self.clock.sleep(policy.retry_delay);
                }
                RetryDecision::Abort => {
                    transition(state, ExecState::Aborted, attempts);
                    return Err(into_error(command, outcome, attempts));
                }
            }
        }
    }
}

fn transition(from: ExecState, to: ExecState, attempt: u32) -> ExecState {
    debug!("Attempt {}: {} -> {}", attempt, from, to);
    to
}

fn into_error(command: &str, outcome: AttemptOutcome, attempts: u32) -> OvercastError {
    match outcome {
        AttemptOutcome::TimedOut { remaining_input } => OvercastError::CommandTimedOut {
            command: command.to_string(),
            remaining_input,
            attempts,
        },
        AttemptOutcome::Failed {
            remaining_input, ..
        } => OvercastError::CommandFailed {
            command: command.to_string(),
            remaining_input,
            attempts,
        },
        AttemptOutcome::Succeeded => unreachable!("success is returned before retry evaluation"),
    }
}
