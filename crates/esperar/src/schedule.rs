//! Retry Schedules
//!
//! Ordered wait durations between condition checks. The last entry repeats
//! until the deadline, so `[1000, 2000, 5000]` waits 1s, 2s, 5s, 5s, ...
//!
//! ## Toyota Way Application
//!
//! - **Heijunka**: Predictable polling gaps keep test timing level
//! - **Poka-Yoke**: A schedule cannot be built empty or with negative gaps

use crate::result::{EsperarError, EsperarResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default interval for DOM-oriented checks (100ms)
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Default schedule for value polling and block retries
pub const POLLING_INTERVALS_MS: [u64; 4] = [100, 250, 500, 1000];

// =============================================================================
// RETRY SCHEDULE
// =============================================================================

/// Non-empty sequence of waits between retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct RetrySchedule {
    intervals: Vec<Duration>,
}

impl RetrySchedule {
    /// Create a schedule from durations
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `intervals` is empty
    pub fn new(intervals: Vec<Duration>) -> EsperarResult<Self> {
        if intervals.is_empty() {
            return Err(EsperarError::configuration(
                "retry schedule must contain at least one interval",
            ));
        }
        Ok(Self { intervals })
    }

    /// A schedule that always waits the same amount
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self {
            intervals: vec![interval],
        }
    }

    /// The polling preset: 100ms, 250ms, 500ms, then 1s repeating
    #[must_use]
    pub fn polling() -> Self {
        Self {
            intervals: POLLING_INTERVALS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    /// Create a schedule from milliseconds
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `millis` is empty
    pub fn from_millis(millis: &[u64]) -> EsperarResult<Self> {
        Self::new(millis.iter().map(|ms| Duration::from_millis(*ms)).collect())
    }

    /// Create a schedule from signed milliseconds, as read from config files
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `millis` is empty or has a negative entry
    pub fn from_signed_millis(millis: &[i64]) -> EsperarResult<Self> {
        let intervals = millis
            .iter()
            .enumerate()
            .map(|(index, ms)| {
                u64::try_from(*ms).map(Duration::from_millis).map_err(|_| {
                    EsperarError::configuration(format!(
                        "retry interval #{index} is negative ({ms}ms)"
                    ))
                })
            })
            .collect::<EsperarResult<Vec<_>>>()?;
        Self::new(intervals)
    }

    /// Wait before retry `retry` (1-based): `intervals[min(retry - 1, len - 1)]`
    #[must_use]
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let last = self.intervals.len() - 1;
        self.intervals[retry.saturating_sub(1).min(last)]
    }

    /// The configured intervals
    #[must_use]
    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Iterate the waits of successive retries, repeating the last one forever
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..).map(move |retry| self.delay_for_retry(retry))
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }
}

impl TryFrom<Vec<u64>> for RetrySchedule {
    type Error = EsperarError;

    fn try_from(millis: Vec<u64>) -> EsperarResult<Self> {
        Self::from_millis(&millis)
    }
}

impl From<RetrySchedule> for Vec<u64> {
    fn from(schedule: RetrySchedule) -> Self {
        schedule
            .intervals
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect()
    }
}

impl std::fmt::Display for RetrySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|d| format!("{}ms", d.as_millis()))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
