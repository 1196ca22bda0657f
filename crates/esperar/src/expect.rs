//! Polling Matchers
//!
//! Matcher-style waits over a value-producing closure: fetch the value,
//! compare it, retry until it matches. Failures name the expected state and
//! the last received value.
//!
//! ```ignore
//! let status = Poll::new(|| async { api.status().await })
//!     .with_timeout_ms(10_000)
//!     .to_equal(200_u16)
//!     .await?;
//! ```

use crate::condition::{Failure, FnCondition};
use crate::config::EvaluateOptions;
use crate::evaluator::{evaluate, run};
use crate::result::{EsperarError, EsperarResult};
use crate::schedule::RetrySchedule;
use futures::FutureExt;
use regex::Regex;
use std::fmt::{self, Debug};
use std::future::Future;

// =============================================================================
// POLL
// =============================================================================

/// A value poller awaiting a matcher
pub struct Poll<F> {
    fetch: F,
    options: EvaluateOptions,
    message: Option<String>,
    negate: bool,
}

impl<F> Poll<F> {
    /// Poll `fetch` with polling defaults
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            options: EvaluateOptions::polling(),
            message: None,
            negate: false,
        }
    }

    /// Replace all options
    #[must_use]
    pub fn with_options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.options = self.options.with_timeout_ms(timeout_ms);
        self
    }

    /// Set the retry schedule
    #[must_use]
    pub fn with_intervals(mut self, intervals: RetrySchedule) -> Self {
        self.options = self.options.with_intervals(intervals);
        self
    }

    /// Custom description for failure messages
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Invert the next matcher
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl<F> Debug for Poll<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poll")
            .field("options", &self.options)
            .field("message", &self.message)
            .field("negate", &self.negate)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, T> Poll<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: Debug,
{
    /// Wait until the value equals `expected`
    pub async fn to_equal<U>(self, expected: U) -> EsperarResult<T>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let description = format!("equal {expected:?}");
        self.check(description, move |value| *value == expected)
            .await
    }

    /// Wait until `predicate` accepts the value
    pub async fn to_satisfy<P>(self, description: impl Into<String>, predicate: P) -> EsperarResult<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.check(description.into(), predicate).await
    }

    /// Wait until the string value contains `needle`
    pub async fn to_contain(self, needle: impl Into<String>) -> EsperarResult<T>
    where
        T: AsRef<str>,
    {
        let needle = needle.into();
        let description = format!("contain {needle:?}");
        self.check(description, move |value| value.as_ref().contains(&needle))
            .await
    }

    /// Wait until the string value matches a regex
    ///
    /// # Errors
    ///
    /// Returns a configuration error, before fetching, if `pattern` is invalid
    pub async fn to_match(self, pattern: &str) -> EsperarResult<T>
    where
        T: AsRef<str>,
    {
        let regex = Regex::new(pattern).map_err(|err| {
            EsperarError::configuration(format!("invalid pattern {pattern:?}: {err}"))
        })?;
        let description = format!("match /{pattern}/");
        self.check(description, move |value| regex.is_match(value.as_ref()))
            .await
    }

    async fn check<P>(self, expected: String, mut matches: P) -> EsperarResult<T>
    where
        P: FnMut(&T) -> bool,
    {
        let Self {
            mut fetch,
            options,
            message,
            negate,
        } = self;
        let expected = if negate {
            format!("not {expected}")
        } else {
            expected
        };
        let description = message.unwrap_or_else(|| format!("polled value to {expected}"));
        let condition =
            FnCondition::new(move || fetch().map(Ok::<T, Failure>)).describe(description);
        let judge = move |value: &T| {
            if matches(value) == negate {
                Err(Failure::new(format!("polled value did not {expected}"))
                    .with_expected(expected.clone())
                    .with_received(format!("{value:?}")))
            } else {
                Ok(())
            }
        };
        run(condition, &options, judge).await?.into_result()
    }
}

impl<F, Fut, V> Poll<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<V>>,
    V: Debug,
{
    /// Wait until the polled option is `Some`
    pub async fn to_be_some(self) -> EsperarResult<Option<V>> {
        self.check("be Some(_)".to_string(), Option::is_some).await
    }
}

// =============================================================================
// TO PASS
// =============================================================================

/// Retry a fallible block until it returns `Ok`
///
/// Every `Err` is transient; only the last one is reported on timeout.
pub async fn to_pass<F, Fut, T, E>(block: F, options: &EvaluateOptions) -> EsperarResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    evaluate(FnCondition::new(block).describe("block to pass"), options)
        .await?
        .into_result()
}
