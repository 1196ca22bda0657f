//! Soft Waits
//!
//! Collect terminal failures from several evaluations without stopping the
//! test at the first one.
//!
//! ## Toyota Way Application:
//! - **Jidoka**: Collect all failures for comprehensive error reporting
//! - **Poka-Yoke**: Fail-fast mode returns the first error unchanged

use crate::condition::Failure;
use crate::outcome::EvaluationOutcome;
use crate::result::{EsperarError, EsperarResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A single failed evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftFailure {
    /// Position of the failed evaluation among all recorded evaluations
    pub index: usize,
    /// Rendered terminal error
    pub message: String,
    /// Last transient failure, for timeouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<Failure>,
}

/// How failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftMode {
    /// Collect all failures (default)
    #[default]
    Collect,
    /// Stop on first failure
    FailFast,
}

/// Soft wait collector
///
/// ## Example
///
/// ```ignore
/// let mut soft = SoftWaits::new();
/// soft.record(poll_until(fetch_status, &options).await);
/// soft.record(evaluate(toast_visible, &options).await?.into_result());
/// soft.verify()?;
/// ```
#[derive(Debug, Default)]
pub struct SoftWaits {
    failures: Vec<SoftFailure>,
    mode: SoftMode,
    evaluation_count: usize,
}

impl SoftWaits {
    /// Create a collector in `Collect` mode
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a specific mode
    #[must_use]
    pub fn with_mode(mode: SoftMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> SoftMode {
        self.mode
    }

    /// Record the result of an evaluation, keeping any error
    pub fn record<T>(&mut self, result: EsperarResult<T>) -> Option<T> {
        self.evaluation_count += 1;
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(&err);
                None
            }
        }
    }

    /// Record a terminal outcome
    pub fn record_outcome<T>(&mut self, outcome: EvaluationOutcome<T>) -> Option<T> {
        self.record(outcome.into_result())
    }

    /// Record a result, returning the error in `FailFast` mode
    ///
    /// # Errors
    ///
    /// Returns the evaluation error unchanged when the mode is `FailFast`
    pub fn try_record<T>(&mut self, result: EsperarResult<T>) -> EsperarResult<Option<T>> {
        self.evaluation_count += 1;
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.push(&err);
                match self.mode {
                    SoftMode::Collect => Ok(None),
                    SoftMode::FailFast => Err(err),
                }
            }
        }
    }

    fn push(&mut self, err: &EsperarError) {
        tracing::debug!(index = self.evaluation_count - 1, error = %err, "soft wait failed");
        self.failures.push(SoftFailure {
            index: self.evaluation_count - 1,
            message: err.to_string(),
            last_failure: err.last_failure().cloned(),
        });
    }

    /// All failures
    #[must_use]
    pub fn failures(&self) -> &[SoftFailure] {
        &self.failures
    }

    /// Number of failures
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of evaluations recorded
    #[must_use]
    pub const fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }

    /// Whether every recorded evaluation succeeded
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Clear all recorded failures
    pub fn clear(&mut self) {
        self.failures.clear();
        self.evaluation_count = 0;
    }

    /// Fail if any recorded evaluation failed
    ///
    /// # Errors
    ///
    /// Returns `SoftFailures` listing every failure in order
    pub fn verify(&self) -> EsperarResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let mut summary = String::new();
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                summary.push('\n');
            }
            let _ = write!(summary, "  {}. {}", i + 1, failure.message);
        }
        Err(EsperarError::SoftFailures {
            count: self.failures.len(),
            summary,
        })
    }
}
