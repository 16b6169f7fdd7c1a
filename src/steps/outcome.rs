//! Attempt outcomes and execution states.

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Exit code 0.
    Succeeded,

    /// Non-zero exit (or killed by a signal we did not send).
    Failed {
        exit_code: Option<i32>,
        /// Input the command never consumed.
        remaining_input: String,
    },

    /// Deadline reached; the process was killed.
    TimedOut {
        /// Input the command never consumed.
        remaining_input: String,
    },
}

impl AttemptOutcome {
    /// State the executor moves to after this outcome.
    pub fn state(&self) -> ExecState {
        match self {
            AttemptOutcome::Succeeded => ExecState::Succeeded,
            AttemptOutcome::Failed { .. } => ExecState::Failed,
            AttemptOutcome::TimedOut { .. } => ExecState::TimedOut,
        }
    }
}

/// State of a command step.
///
/// `Idle → Running → {Succeeded, Failed, TimedOut}`; `Failed` and
/// `TimedOut` lead back to `Running` on retry or on to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Idle,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl ExecState {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecState::Succeeded | ExecState::Aborted)
    }

    /// Get a display character for this state.
    pub fn display_char(&self) -> char {
        match self {
            ExecState::Idle => '○',
            ExecState::Running => '◉',
            ExecState::Succeeded => '✓',
            ExecState::Failed => '✗',
            ExecState::TimedOut => '⧗',
            ExecState::Aborted => '⊘',
        }
    }
}

impl std::fmt::Display for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecState::Idle => "idle",
            ExecState::Running => "running",
            ExecState::Succeeded => "succeeded",
            ExecState::Failed => "failed",
            ExecState::TimedOut => "timed out",
            ExecState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}
