//! Evaluation options and project-wide defaults.
//!
//! [`EvaluateOptions`] configures a single wait. [`EvaluatorConfig`] holds
//! the defaults a test suite wants for every wait and can be read from a
//! YAML or JSON file. Neither is global; both are passed explicitly.

use crate::result::{EsperarError, EsperarResult};
use crate::schedule::{RetrySchedule, DEFAULT_INTERVAL_MS, POLLING_INTERVALS_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for assertions (5 seconds)
pub const DEFAULT_ASSERTION_TIMEOUT_MS: i64 = 5_000;

/// Default timeout for value polling (5 seconds)
pub const DEFAULT_POLL_TIMEOUT_MS: i64 = 5_000;

/// Default timeout for whole-test budgets (30 seconds)
pub const DEFAULT_TEST_TIMEOUT_MS: i64 = 30_000;

// =============================================================================
// EVALUATE OPTIONS
// =============================================================================

/// Options for a single evaluation
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    /// Total wall-clock budget in milliseconds; must be greater than zero
    pub timeout_ms: i64,
    /// Waits between checks; `None` uses `default_interval`
    pub intervals: Option<RetrySchedule>,
    /// Fixed wait used when no schedule is given
    pub default_interval: Duration,
    /// Cancellation signal observed between checks
    pub cancel: Option<CancellationToken>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self::assertion()
    }
}

impl EvaluateOptions {
    /// Assertion defaults: 5s timeout, fixed 100ms interval
    #[must_use]
    pub fn assertion() -> Self {
        Self {
            timeout_ms: DEFAULT_ASSERTION_TIMEOUT_MS,
            intervals: None,
            default_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            cancel: None,
        }
    }

    /// Polling defaults: 5s timeout, 100/250/500/1000ms schedule
    #[must_use]
    pub fn polling() -> Self {
        Self {
            timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            intervals: Some(RetrySchedule::polling()),
            ..Self::assertion()
        }
    }

    /// Whole-test defaults: 30s timeout, fixed 100ms interval
    #[must_use]
    pub fn test() -> Self {
        Self {
            timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
            ..Self::assertion()
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set timeout from a duration, rounded up to whole milliseconds
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = i64::try_from(millis).unwrap_or(i64::MAX);
        self
    }

    /// Set the retry schedule
    #[must_use]
    pub fn with_intervals(mut self, intervals: RetrySchedule) -> Self {
        self.intervals = Some(intervals);
        self
    }

    /// Set the fixed interval used without a schedule
    #[must_use]
    pub const fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Observe a cancellation token
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Check the options and resolve the timeout and schedule
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the timeout is not greater than zero
    pub fn validate(&self) -> EsperarResult<(Duration, RetrySchedule)> {
        if self.timeout_ms <= 0 {
            return Err(EsperarError::configuration(format!(
                "timeout must be greater than zero, got {}ms",
                self.timeout_ms
            )));
        }
        let timeout = Duration::from_millis(self.timeout_ms as u64);
        let schedule = self
            .intervals
            .clone()
            .unwrap_or_else(|| RetrySchedule::fixed(self.default_interval));
        Ok((timeout, schedule))
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

// =============================================================================
// EVALUATOR CONFIG
// =============================================================================

/// Project-wide defaults for every kind of wait
///
/// Millisecond fields are signed so that invalid values from a config file
/// are reported as configuration errors instead of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Timeout for assertions
    pub assertion_timeout_ms: i64,
    /// Fixed interval for assertions
    pub assertion_interval_ms: i64,
    /// Timeout for value polling and block retries
    pub poll_timeout_ms: i64,
    /// Schedule for value polling and block retries
    pub poll_intervals_ms: Vec<i64>,
    /// Timeout for whole-test budgets
    pub test_timeout_ms: i64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            assertion_timeout_ms: DEFAULT_ASSERTION_TIMEOUT_MS,
            assertion_interval_ms: DEFAULT_INTERVAL_MS as i64,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            poll_intervals_ms: POLLING_INTERVALS_MS.iter().map(|ms| *ms as i64).collect(),
            test_timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
        }
    }
}

impl EvaluatorConfig {
    /// Create the default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> EsperarResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> EsperarResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` is read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> EsperarResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_yaml_str(&content)?,
        };
        tracing::debug!(path = %path.display(), "loaded evaluator config");
        Ok(config)
    }

    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid field
    pub fn validate(&self) -> EsperarResult<()> {
        for (field, value) in [
            ("assertion_timeout_ms", self.assertion_timeout_ms),
            ("poll_timeout_ms", self.poll_timeout_ms),
            ("test_timeout_ms", self.test_timeout_ms),
        ] {
            if value <= 0 {
                return Err(EsperarError::configuration(format!(
                    "{field} must be greater than zero, got {value}"
                )));
            }
        }
        self.assertion_interval()?;
        RetrySchedule::from_signed_millis(&self.poll_intervals_ms)?;
        Ok(())
    }

    fn assertion_interval(&self) -> EsperarResult<Duration> {
        if self.assertion_interval_ms < 0 {
            return Err(EsperarError::configuration(format!(
                "assertion_interval_ms must not be negative, got {}",
                self.assertion_interval_ms
            )));
        }
        Ok(Duration::from_millis(self.assertion_interval_ms as u64))
    }

    /// Options for assertions
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `assertion_interval_ms` is negative
    pub fn assertion_options(&self) -> EsperarResult<EvaluateOptions> {
        Ok(EvaluateOptions::assertion()
            .with_timeout_ms(self.assertion_timeout_ms)
            .with_default_interval(self.assertion_interval()?))
    }

    /// Options for value polling and block retries
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `poll_intervals_ms` is empty or has a
    /// negative entry
    pub fn poll_options(&self) -> EsperarResult<EvaluateOptions> {
        let schedule = RetrySchedule::from_signed_millis(&self.poll_intervals_ms)?;
        Ok(EvaluateOptions::polling()
            .with_timeout_ms(self.poll_timeout_ms)
            .with_intervals(schedule))
    }

    /// Options for whole-test budgets
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `assertion_interval_ms` is negative
    pub fn test_options(&self) -> EsperarResult<EvaluateOptions> {
        Ok(self.assertion_options()?.with_timeout_ms(self.test_timeout_ms))
    }
}
