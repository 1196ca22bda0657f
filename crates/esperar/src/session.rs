//! Per-call evaluation state.
//!
//! A session is created when an evaluation starts and consumed when it
//! produces an [`EvaluationOutcome`]. It does not read a clock itself: the
//! async and blocking loops pass in elapsed time from their own clocks.

use crate::condition::Failure;
use crate::outcome::EvaluationOutcome;
use crate::schedule::RetrySchedule;
use std::time::Duration;
use uuid::Uuid;

/// State of one evaluation
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    id: Uuid,
    description: String,
    timeout: Duration,
    schedule: RetrySchedule,
    attempts: usize,
    last_failure: Option<Failure>,
}

impl EvaluationSession {
    /// Start a session
    #[must_use]
    pub fn new(description: impl Into<String>, timeout: Duration, schedule: RetrySchedule) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            timeout,
            schedule,
            attempts: 0,
            last_failure: None,
        }
    }

    /// Session identifier for log correlation
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// What is being waited for
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Total budget
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks started so far
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Most recent failure
    #[must_use]
    pub const fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    /// Count a check that is about to run
    pub fn begin_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Keep a failed check as the last failure
    pub fn record_failure(&mut self, failure: Failure) {
        self.last_failure = Some(failure);
    }

    /// Whether the deadline has been reached
    #[must_use]
    pub fn is_expired(&self, elapsed: Duration) -> bool {
        elapsed >= self.timeout
    }

    /// Time left before the deadline
    #[must_use]
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.timeout.saturating_sub(elapsed)
    }

    /// Wait before the next check, clamped to the deadline
    ///
    /// `None` once the deadline has been reached: no new wait is started.
    #[must_use]
    pub fn next_wait(&self, elapsed: Duration) -> Option<Duration> {
        if self.is_expired(elapsed) {
            return None;
        }
        let delay = self.schedule.delay_for_retry(self.attempts);
        Some(delay.min(self.remaining(elapsed)))
    }

    /// Finish with a satisfying value
    pub fn satisfied<T>(self, value: T, elapsed: Duration) -> EvaluationOutcome<T> {
        EvaluationOutcome::Satisfied {
            value,
            description: self.description,
            attempts: self.attempts,
            elapsed,
        }
    }

    /// Finish at the deadline
    pub fn timed_out<T>(self, elapsed: Duration) -> EvaluationOutcome<T> {
        let last_failure = self
            .last_failure
            .unwrap_or_else(|| Failure::new("no check completed before the deadline"));
        EvaluationOutcome::TimedOut {
            description: self.description,
            last_failure,
            attempts: self.attempts,
            elapsed,
            timeout: self.timeout,
        }
    }

    /// Finish on cancellation
    pub fn aborted<T>(self, reason: impl Into<String>, elapsed: Duration) -> EvaluationOutcome<T> {
        EvaluationOutcome::Aborted {
            description: self.description,
            reason: reason.into(),
            attempts: self.attempts,
            elapsed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(timeout_ms: u64, intervals: &[u64]) -> EvaluationSession {
        EvaluationSession::new(
            "test condition",
            Duration::from_millis(timeout_ms),
            RetrySchedule::from_millis(intervals).unwrap(),
        )
    }

    #[test]
    fn test_new_session_is_fresh() {
        let s = session(1000, &[100]);
        assert_eq!(s.attempts(), 0);
        assert!(s.last_failure().is_none());
        assert_eq!(s.description(), "test condition");
        assert_eq!(s.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(session(1000, &[100]).id(), session(1000, &[100]).id());
    }

    #[test]
    fn test_next_wait_follows_schedule() {
        let mut s = session(10_000, &[100, 200]);
        s.begin_attempt();
        assert_eq!(s.next_wait(Duration::ZERO), Some(Duration::from_millis(100)));
        s.begin_attempt();
        assert_eq!(
            s.next_wait(Duration::from_millis(100)),
            Some(Duration::from_millis(200))
        );
        s.begin_attempt();
        assert_eq!(
            s.next_wait(Duration::from_millis(300)),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_next_wait_clamped_to_deadline() {
        let mut s = session(1000, &[400]);
        s.begin_attempt();
        assert_eq!(
            s.next_wait(Duration::from_millis(900)),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_no_wait_after_deadline() {
        let mut s = session(1000, &[100]);
        s.begin_attempt();
        assert!(s.is_expired(Duration::from_millis(1000)));
        assert_eq!(s.next_wait(Duration::from_millis(1000)), None);
        assert_eq!(s.remaining(Duration::from_millis(1500)), Duration::ZERO);
    }

    #[test]
    fn test_timed_out_carries_last_failure() {
        let mut s = session(1000, &[100]);
        s.begin_attempt();
        s.record_failure(Failure::new("first"));
        s.begin_attempt();
        s.record_failure(Failure::new("second"));
        let outcome: EvaluationOutcome<()> = s.timed_out(Duration::from_millis(1000));
        assert_eq!(outcome.last_failure().unwrap().message, "second");
        assert_eq!(outcome.attempts(), 2);
    }

    #[test]
    fn test_timed_out_without_failure_has_placeholder() {
        let outcome: EvaluationOutcome<()> = session(1, &[1]).timed_out(Duration::from_millis(1));
        assert!(outcome.last_failure().unwrap().message.contains("deadline"));
    }

    #[test]
    fn test_satisfied_and_aborted() {
        let mut s = session(1000, &[100]);
        s.begin_attempt();
        let outcome = s.satisfied("done", Duration::ZERO);
        assert_eq!(outcome.value(), Some(&"done"));
        assert_eq!(outcome.attempts(), 1);

        let outcome: EvaluationOutcome<()> = session(1000, &[100]).aborted("stop", Duration::ZERO);
        assert!(outcome.is_aborted());
        assert_eq!(outcome.attempts(), 0);
    }

    proptest! {
        #[test]
        fn prop_wait_never_passes_deadline(
            timeout_ms in 1u64..20_000,
            elapsed_ms in 0u64..25_000,
            intervals in prop::collection::vec(0u64..10_000, 1..5),
            attempts in 1usize..20,
        ) {
            let mut s = session(timeout_ms, &intervals);
            for _ in 0..attempts {
                s.begin_attempt();
            }
            let elapsed = Duration::from_millis(elapsed_ms);
            match s.next_wait(elapsed) {
                Some(wait) => prop_assert!(elapsed + wait <= Duration::from_millis(timeout_ms)),
                None => prop_assert!(elapsed_ms >= timeout_ms),
            }
        }
    }
}
