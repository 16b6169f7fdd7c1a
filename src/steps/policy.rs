//! Deadline and retry policy for command steps.
//!
//! Four settings interact:
//! - `total_timeout` bounds all attempts together (one overall deadline,
//!   fixed when the step starts)
//! - `per_attempt_timeout` bounds each attempt, never past the overall deadline
//! - `retry_delay` is slept between attempts
//! - `retry_on_failure` enables retries at all

use std::time::{Duration, Instant};

use super::outcome::AttemptOutcome;

/// Retry/deadline settings of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepPolicy {
    pub total_timeout: Option<Duration>,
    pub per_attempt_timeout: Option<Duration>,
    pub retry_delay: Duration,
    pub retry_on_failure: bool,
}

/// What to do after a non-successful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep `retry_delay`, then run another attempt.
    Retry,
    /// Stop and report the attempt's error.
    Abort,
}

impl StepPolicy {
    /// Overall deadline for a step started at `start`.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn overall_deadline(&self, start: Instant) -> Option<Instant> {
        self.total_timeout.and_then(|t| start.checked_add(t))
    }

    /// Deadline for an attempt starting at `now`.
    pub fn attempt_deadline(&self, now: Instant, overall: Option<Instant>) -> Option<Instant> {
        let own = self.per_attempt_timeout.and_then(|t| now.checked_add(t));
        match (own, overall) {
            (Some(own), Some(overall)) => Some(own.min(overall)),
            (own, None) => own,
            (None, overall) => overall,
        }
    }

    /// Decide whether to retry after `outcome`.
    ///
    /// A failure is retried whenever retries are on. A timeout is retried
    /// only if another attempt could still start before the overall
    /// deadline; without an overall deadline a timeout is final.
    pub fn decide(
        &self,
        outcome: &AttemptOutcome,
        now: Instant,
        overall: Option<Instant>,
    ) -> RetryDecision {
        match outcome {
            AttemptOutcome::Succeeded => RetryDecision::Abort,
            _ if !self.retry_on_failure => RetryDecision::Abort,
            AttemptOutcome::Failed { .. } => RetryDecision::Retry,
            AttemptOutcome::TimedOut { .. } => match overall {
                Some(deadline)
                    if now
                        .checked_add(self.retry_delay)
                        .is_some_and(|next| next < deadline) =>
                {
                    RetryDecision::Retry
                }
                _ => RetryDecision::Abort,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn timed_out() -> AttemptOutcome {
        AttemptOutcome::TimedOut {
            remaining_input: String::new(),
        }
    }

    fn failed() -> AttemptOutcome {
        AttemptOutcome::Failed {
            exit_code: Some(1),
            remaining_input: String::new(),
        }
    }

    #[test]
    fn attempt_deadline_is_clamped_to_overall() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            total_timeout: Some(secs(12)),
            per_attempt_timeout: Some(secs(5)),
            ..Default::default()
        };
        let overall = policy.overall_deadline(t0);
        assert_eq!(overall, Some(t0 + secs(12)));
        assert_eq!(policy.attempt_deadline(t0, overall), Some(t0 + secs(5)));
        assert_eq!(
            policy.attempt_deadline(t0 + secs(9), overall),
            Some(t0 + secs(12))
        );
    }

    #[test]
    fn attempt_deadline_without_total() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            per_attempt_timeout: Some(secs(5)),
            ..Default::default()
        };
        assert_eq!(policy.overall_deadline(t0), None);
        assert_eq!(policy.attempt_deadline(t0, None), Some(t0 + secs(5)));
    }

    #[test]
    fn attempt_deadline_total_only_and_none() {
        let t0 = Instant::now();
        let total_only = StepPolicy {
            total_timeout: Some(secs(30)),
            ..Default::default()
        };
        let overall = total_only.overall_deadline(t0);
        assert_eq!(total_only.attempt_deadline(t0 + secs(3), overall), overall);

        let unbounded = StepPolicy::default();
        assert_eq!(unbounded.attempt_deadline(t0, None), None);
    }

    #[test]
    fn unrepresentable_timeouts_mean_no_deadline() {
        let t0 = Instant::now();
        let huge = Duration::from_secs(u64::MAX);
        let policy = StepPolicy {
            total_timeout: Some(huge),
            per_attempt_timeout: Some(huge),
            ..Default::default()
        };
        assert_eq!(policy.overall_deadline(t0), None);
        assert_eq!(policy.attempt_deadline(t0, None), None);

        let bounded = Some(t0 + secs(10));
        assert_eq!(policy.attempt_deadline(t0, bounded), bounded);
    }

    #[test]
    fn huge_retry_delay_does_not_retry_a_timeout() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            total_timeout: Some(secs(60)),
            retry_delay: Duration::from_secs(u64::MAX),
            retry_on_failure: true,
            ..Default::default()
        };
        let overall = policy.overall_deadline(t0);
        assert_eq!(
            policy.decide(&timed_out(), t0, overall),
            RetryDecision::Abort
        );
    }

    #[test]
    fn no_retry_when_disabled() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            total_timeout: Some(secs(60)),
            ..Default::default()
        };
        let overall = policy.overall_deadline(t0);
        assert_eq!(policy.decide(&failed(), t0, overall), RetryDecision::Abort);
        assert_eq!(policy.decide(&timed_out(), t0, overall), RetryDecision::Abort);
    }

    #[test]
    fn failures_always_retry_when_enabled() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            retry_on_failure: true,
            ..Default::default()
        };
        assert_eq!(policy.decide(&failed(), t0, None), RetryDecision::Retry);
    }

    #[test]
    fn timeouts_retry_only_with_time_left() {
        let t0 = Instant::now();
        let policy = StepPolicy {
            total_timeout: Some(secs(12)),
            per_attempt_timeout: Some(secs(5)),
            retry_delay: secs(2),
            retry_on_failure: true,
        };
        let overall = policy.overall_deadline(t0);

        assert_eq!(
            policy.decide(&timed_out(), t0 + secs(5), overall),
            RetryDecision::Retry
        );
        assert_eq!(
            policy.decide(&timed_out(), t0 + secs(10), overall),
            RetryDecision::Abort
        );
        assert_eq!(
            policy.decide(&timed_out(), t0 + secs(12), overall),
            RetryDecision::Abort
        );
    }

    #[test]
    fn timeouts_without_overall_deadline_are_final() {
        let policy = StepPolicy {
            per_attempt_timeout: Some(secs(1)),
            retry_on_failure: true,
            ..Default::default()
        };
        assert_eq!(
            policy.decide(&timed_out(), Instant::now(), None),
            RetryDecision::Abort
        );
    }
}
