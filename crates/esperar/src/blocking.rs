//! Blocking Retry Assertions
//!
//! The same evaluation loop for callers without an async runtime. Waits
//! block the calling thread; cancellation is checked between checks and in
//! short slices while waiting.
//!
//! ## Toyota Way Application
//!
//! - **Heijunka**: Same schedule semantics as the async evaluator
//! - **Jidoka**: Fail with the last expected/received pair after the deadline

use crate::condition::Failure;
use crate::config::EvaluateOptions;
use crate::evaluator::CANCELLED_REASON;
use crate::outcome::EvaluationOutcome;
use crate::result::EsperarResult;
use crate::session::EvaluationSession;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while a cancellation token is attached
pub const CANCEL_POLL_SLICE: Duration = Duration::from_millis(10);

// =============================================================================
// BLOCKING EVALUATION
// =============================================================================

/// Check `condition` on the calling thread until it succeeds, times out or is cancelled
///
/// # Errors
///
/// Returns a configuration error, without checking the condition, if the
/// options are invalid.
pub fn evaluate_blocking<F, T, E>(
    condition: F,
    options: &EvaluateOptions,
) -> EsperarResult<EvaluationOutcome<T>>
where
    F: FnMut() -> Result<T, E>,
    E: Into<Failure>,
{
    run_blocking("condition", condition, options)
}

fn run_blocking<F, T, E>(
    description: &str,
    mut check: F,
    options: &EvaluateOptions,
) -> EsperarResult<EvaluationOutcome<T>>
where
    F: FnMut() -> Result<T, E>,
    E: Into<Failure>,
{
    let (timeout, schedule) = options.validate()?;
    let mut session = EvaluationSession::new(description, timeout, schedule);
    let span = tracing::debug_span!(
        "evaluate_blocking",
        session = %session.id(),
        description = %session.description(),
        timeout_ms = timeout.as_millis() as u64,
    );
    let _entered = span.enter();

    let start = Instant::now();
    loop {
        if options.is_cancelled() {
            tracing::info!(attempts = session.attempts(), "evaluation aborted");
            return Ok(session.aborted(CANCELLED_REASON, start.elapsed()));
        }
        if session.is_expired(start.elapsed()) {
            tracing::warn!(
                attempts = session.attempts(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "evaluation timed out"
            );
            return Ok(session.timed_out(start.elapsed()));
        }

        session.begin_attempt();
        match check() {
            Ok(value) => {
                tracing::debug!(attempts = session.attempts(), "condition satisfied");
                return Ok(session.satisfied(value, start.elapsed()));
            }
            Err(err) => {
                let failure = err.into();
                tracing::debug!(
                    attempt = session.attempts(),
                    failure = %failure.message,
                    "condition not satisfied"
                );
                session.record_failure(failure);
            }
        }

        if let Some(wait) = session.next_wait(start.elapsed()) {
            sleep_observing(wait, options);
        }
    }
}

fn sleep_observing(wait: Duration, options: &EvaluateOptions) {
    let Some(token) = options.cancel.as_ref() else {
        std::thread::sleep(wait);
        return;
    };
    let until = Instant::now() + wait;
    while !token.is_cancelled() {
        let left = until.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        std::thread::sleep(left.min(CANCEL_POLL_SLICE));
    }
}

// =============================================================================
// RETRY ASSERTION
// =============================================================================

/// A blocking retry assertion
///
/// ## Example
///
/// ```ignore
/// let mut assertion = RetryAssertion::new(|| {
///     if some_condition() {
///         Ok(())
///     } else {
///         Err("condition not met")
///     }
/// })
/// .with_timeout_ms(5000);
///
/// assertion.verify()?;
/// ```
pub struct RetryAssertion<F> {
    check: F,
    options: EvaluateOptions,
    description: Option<String>,
}

impl<F> RetryAssertion<F> {
    /// Create a retry assertion with assertion defaults
    #[must_use]
    pub fn new(check: F) -> Self {
        Self {
            check,
            options: EvaluateOptions::assertion(),
            description: None,
        }
    }

    /// Replace all options
    #[must_use]
    pub fn with_options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.options = self.options.with_timeout_ms(timeout_ms);
        self
    }

    /// Set the retry schedule
    #[must_use]
    pub fn with_intervals(mut self, intervals: crate::schedule::RetrySchedule) -> Self {
        self.options = self.options.with_intervals(intervals);
        self
    }

    /// Use a fixed poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.intervals = None;
        self.options.default_interval = interval;
        self
    }

    /// Set a description for the assertion
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Get the current options
    #[must_use]
    pub const fn options(&self) -> &EvaluateOptions {
        &self.options
    }
}

impl<F, T, E> RetryAssertion<F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<Failure>,
{
    /// Retry until success, returning the full outcome
    pub fn evaluate(&mut self) -> EsperarResult<EvaluationOutcome<T>> {
        let description = self.description.as_deref().unwrap_or("assertion");
        run_blocking(description, &mut self.check, &self.options)
    }

    /// Retry until success or timeout
    ///
    /// # Errors
    ///
    /// Returns a timeout error carrying the last failure, an aborted error,
    /// or a configuration error
    pub fn verify(&mut self) -> EsperarResult<T> {
        self.evaluate()?.into_result()
    }

    /// Check once without retrying
    pub fn verify_once(&mut self) -> Result<T, Failure> {
        (self.check)().map_err(Into::into)
    }
}

impl<F> Debug for RetryAssertion<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryAssertion")
            .field("options", &self.options)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder helpers for common assertion patterns
// ============================================================================

/// Retry until the produced value equals `expected`
pub fn retry_eq<T: PartialEq + Debug>(
    mut get_actual: impl FnMut() -> T,
    expected: T,
) -> RetryAssertion<impl FnMut() -> Result<T, Failure>> {
    RetryAssertion::new(move || {
        let actual = get_actual();
        if actual == expected {
            Ok(actual)
        } else {
            Err(Failure::mismatch(
                format!("{expected:?}"),
                format!("{actual:?}"),
            ))
        }
    })
}

/// Retry until `check` returns true
pub fn retry_true(
    mut check: impl FnMut() -> bool,
    message: impl Into<String>,
) -> RetryAssertion<impl FnMut() -> Result<(), Failure>> {
    let message = message.into();
    RetryAssertion::new(move || {
        if check() {
            Ok(())
        } else {
            Err(Failure::new(message.clone())
                .with_expected("true")
                .with_received("false"))
        }
    })
}

/// Retry until the produced option is `Some`, yielding its value
pub fn retry_some<T>(
    mut get_opt: impl FnMut() -> Option<T>,
) -> RetryAssertion<impl FnMut() -> Result<T, Failure>> {
    RetryAssertion::new(move || get_opt().ok_or_else(|| Failure::mismatch("Some(_)", "None")))
}

/// Retry until the produced string contains `needle`
pub fn retry_contains(
    mut get_haystack: impl FnMut() -> String,
    needle: impl Into<String>,
) -> RetryAssertion<impl FnMut() -> Result<String, Failure>> {
    let needle = needle.into();
    RetryAssertion::new(move || {
        let haystack = get_haystack();
        if haystack.contains(&needle) {
            Ok(haystack)
        } else {
            Err(Failure::new(format!("expected text to contain {needle:?}"))
                .with_expected(format!("contains {needle:?}"))
                .with_received(format!("{haystack:?}")))
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schedule::RetrySchedule;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    mod evaluate_blocking_tests {
        use super::*;

        #[test]
        fn test_immediate_pass() {
            let outcome =
                evaluate_blocking(|| Ok::<_, Failure>(42), &EvaluateOptions::assertion()).unwrap();
            assert_eq!(outcome.value(), Some(&42));
            assert_eq!(outcome.attempts(), 1);
            assert!(outcome.elapsed() < Duration::from_millis(50));
        }

        #[test]
        fn test_eventual_pass_follows_schedule() {
            let counter = Arc::new(AtomicUsize::new(0));
            let calls = Arc::clone(&counter);
            let options = EvaluateOptions::assertion()
                .with_timeout_ms(5000)
                .with_intervals(RetrySchedule::from_millis(&[10, 20]).unwrap());
            let outcome = evaluate_blocking(
                move || {
                    if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                        Ok(())
                    } else {
                        Err("not yet")
                    }
                },
                &options,
            )
            .unwrap();
            assert!(outcome.is_satisfied());
            assert_eq!(counter.load(Ordering::SeqCst), 3);
            assert!(outcome.elapsed() >= Duration::from_millis(30));
        }

        #[test]
        fn test_timeout_close_to_deadline() {
            let options = EvaluateOptions::assertion()
                .with_timeout_ms(100)
                .with_default_interval(Duration::from_millis(20));
            let outcome = evaluate_blocking(|| Err::<(), _>("always fails"), &options).unwrap();
            assert!(outcome.is_timed_out());
            assert!(outcome.attempts() > 1);
            assert!(outcome.elapsed() >= Duration::from_millis(100));
            assert!(outcome.elapsed() < Duration::from_millis(250));
            assert_eq!(outcome.last_failure().unwrap().message, "always fails");
        }

        #[test]
        fn test_negative_timeout_never_checks() {
            let counter = Arc::new(AtomicUsize::new(0));
            let calls = Arc::clone(&counter);
            let err = evaluate_blocking(
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Failure>(())
                },
                &EvaluateOptions::assertion().with_timeout_ms(-5),
            )
            .unwrap_err();
            assert!(err.is_configuration());
            assert_eq!(counter.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_cancelled_from_another_thread() {
            let token = CancellationToken::new();
            let trigger = token.clone();
            let handle = std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                trigger.cancel();
            });
            let options = EvaluateOptions::assertion()
                .with_timeout_ms(5000)
                .with_intervals(RetrySchedule::from_millis(&[1000]).unwrap())
                .with_cancel(token);
            let outcome = evaluate_blocking(|| Err::<(), _>("never"), &options).unwrap();
            handle.join().unwrap();
            assert!(outcome.is_aborted());
            assert!(outcome.elapsed() < Duration::from_millis(500));
        }

        #[test]
        fn test_cancelled_before_start() {
            let token = CancellationToken::new();
            token.cancel();
            let outcome = evaluate_blocking(
                || Ok::<_, Failure>(()),
                &EvaluateOptions::assertion().with_cancel(token),
            )
            .unwrap();
            assert!(outcome.is_aborted());
            assert_eq!(outcome.attempts(), 0);
        }
    }

    mod retry_assertion_tests {
        use super::*;

        #[test]
        fn test_verify_returns_value() {
            let mut assertion = RetryAssertion::new(|| Ok::<_, Failure>("ready"));
            assert_eq!(assertion.verify().unwrap(), "ready");
        }

        #[test]
        fn test_with_description_in_error() {
            let mut assertion = RetryAssertion::new(|| Err::<(), _>("error"))
                .with_description("checking visibility")
                .with_timeout_ms(50)
                .with_poll_interval(Duration::from_millis(10));
            let err = assertion.verify().unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("checking visibility"));
        }

        #[test]
        fn test_verify_once() {
            let mut assertion = RetryAssertion::new(|| Err::<(), _>("error"));
            assert_eq!(assertion.verify_once().unwrap_err().message, "error");
        }

        #[test]
        fn test_with_poll_interval_clears_schedule() {
            let assertion = RetryAssertion::new(|| Ok::<_, Failure>(()))
                .with_intervals(RetrySchedule::polling())
                .with_poll_interval(Duration::from_millis(50));
            let (_, schedule) = assertion.options().validate().unwrap();
            assert_eq!(schedule, RetrySchedule::fixed(Duration::from_millis(50)));
        }

        #[test]
        fn test_debug() {
            let assertion = RetryAssertion::new(|| Ok::<_, Failure>(())).with_description("test");
            let debug = format!("{assertion:?}");
            assert!(debug.contains("RetryAssertion"));
            assert!(debug.contains("test"));
        }
    }

    mod helper_functions {
        use super::*;

        fn quick<F>(assertion: RetryAssertion<F>) -> RetryAssertion<F> {
            assertion
                .with_timeout_ms(30)
                .with_poll_interval(Duration::from_millis(10))
        }

        #[test]
        fn test_retry_eq_pass() {
            assert_eq!(quick(retry_eq(|| 42, 42)).verify().unwrap(), 42);
        }

        #[test]
        fn test_retry_eq_fail() {
            let err = quick(retry_eq(|| 1, 2)).verify().unwrap_err();
            let failure = err.last_failure().unwrap();
            assert_eq!(failure.expected.as_deref(), Some("2"));
            assert_eq!(failure.received.as_deref(), Some("1"));
        }

        #[test]
        fn test_retry_true() {
            assert!(quick(retry_true(|| true, "should be true")).verify().is_ok());
            let err = quick(retry_true(|| false, "should be true"))
                .verify()
                .unwrap_err();
            assert!(err.to_string().contains("should be true"));
        }

        #[test]
        fn test_retry_some() {
            let mut values = vec![Some(7), None].into_iter().rev();
            let value = quick(retry_some(move || values.next().flatten()))
                .verify()
                .unwrap();
            assert_eq!(value, 7);
            assert!(quick(retry_some::<i32>(|| None)).verify().is_err());
        }

        #[test]
        fn test_retry_contains() {
            let text = quick(retry_contains(|| "hello world".to_string(), "world"))
                .verify()
                .unwrap();
            assert_eq!(text, "hello world");
            let err = quick(retry_contains(|| "hello".to_string(), "world"))
                .verify()
                .unwrap_err();
            assert_eq!(
                err.last_failure().unwrap().received.as_deref(),
                Some("\"hello\"")
            );
        }
    }
}
