//! Terminal results of an evaluation.

use crate::condition::Failure;
use crate::result::{EsperarError, EsperarResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an evaluation ended
///
/// Produced exactly once per evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome<T> {
    /// The condition was satisfied
    Satisfied {
        /// Value returned by the satisfying check
        value: T,
        /// What was waited for
        description: String,
        /// Number of checks, including the satisfying one
        attempts: usize,
        /// Time from start to success
        elapsed: Duration,
    },
    /// The deadline was reached first
    TimedOut {
        /// What was waited for
        description: String,
        /// Failure active at the deadline
        last_failure: Failure,
        /// Number of checks
        attempts: usize,
        /// Time from start to giving up
        elapsed: Duration,
        /// Configured budget
        timeout: Duration,
    },
    /// The caller cancelled the wait
    Aborted {
        /// What was waited for
        description: String,
        /// Why the wait stopped
        reason: String,
        /// Number of checks
        attempts: usize,
        /// Time from start to cancellation
        elapsed: Duration,
    },
}

impl<T> EvaluationOutcome<T> {
    /// Whether the condition was satisfied
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Whether the deadline was reached
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Whether the caller cancelled
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Number of condition checks
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Satisfied { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Time spent in the evaluation
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. }
            | Self::TimedOut { elapsed, .. }
            | Self::Aborted { elapsed, .. } => *elapsed,
        }
    }

    /// What was waited for
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Satisfied { description, .. }
            | Self::TimedOut { description, .. }
            | Self::Aborted { description, .. } => description,
        }
    }

    /// The satisfying value
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Satisfied { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Failure active at the deadline
    #[must_use]
    pub const fn last_failure(&self) -> Option<&Failure> {
        match self {
            Self::TimedOut { last_failure, .. } => Some(last_failure),
            _ => None,
        }
    }

    /// Map the satisfying value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EvaluationOutcome<U> {
        match self {
            Self::Satisfied {
                value,
                description,
                attempts,
                elapsed,
            } => EvaluationOutcome::Satisfied {
                value: f(value),
                description,
                attempts,
                elapsed,
            },
            Self::TimedOut {
                description,
                last_failure,
                attempts,
                elapsed,
                timeout,
            } => EvaluationOutcome::TimedOut {
                description,
                last_failure,
                attempts,
                elapsed,
                timeout,
            },
            Self::Aborted {
                description,
                reason,
                attempts,
                elapsed,
            } => EvaluationOutcome::Aborted {
                description,
                reason,
                attempts,
                elapsed,
            },
        }
    }

    /// Summary for a test runner
    #[must_use]
    pub fn report(&self) -> EvaluationReport {
        let (status, last_failure, reason) = match self {
            Self::Satisfied { .. } => (OutcomeStatus::Satisfied, None, None),
            Self::TimedOut { last_failure, .. } => {
                (OutcomeStatus::TimedOut, Some(last_failure.clone()), None)
            }
            Self::Aborted { reason, .. } => (OutcomeStatus::Aborted, None, Some(reason.clone())),
        };
        EvaluationReport {
            description: self.description().to_string(),
            status,
            attempts: self.attempts(),
            elapsed_ms: self.elapsed().as_millis() as u64,
            last_failure,
            reason,
        }
    }

    /// Convert to the value, or a timeout/abort error
    pub fn into_result(self) -> EsperarResult<T> {
        match self {
            Self::Satisfied { value, .. } => Ok(value),
            Self::TimedOut {
                description,
                last_failure,
                attempts,
                elapsed,
                timeout,
            } => Err(EsperarError::Timeout {
                description,
                timeout_ms: timeout.as_millis() as u64,
                elapsed_ms: elapsed.as_millis() as u64,
                attempts,
                last_failure,
            }),
            Self::Aborted {
                description,
                reason,
                attempts,
                ..
            } => Err(EsperarError::Aborted {
                description,
                reason,
                attempts,
            }),
        }
    }
}

// =============================================================================
// REPORTING
// =============================================================================

/// Outcome kind in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Condition satisfied
    Satisfied,
    /// Deadline reached
    TimedOut,
    /// Caller cancelled
    Aborted,
}

/// Serializable summary of an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// What was waited for
    pub description: String,
    /// How it ended
    pub status: OutcomeStatus,
    /// Number of checks
    pub attempts: usize,
    /// Time spent
    pub elapsed_ms: u64,
    /// Failure active at the deadline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<Failure>,
    /// Abort reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EvaluationReport {
    /// Serialize as JSON
    pub fn to_json(&self) -> EsperarResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize as indented JSON
    pub fn to_json_pretty(&self) -> EsperarResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
