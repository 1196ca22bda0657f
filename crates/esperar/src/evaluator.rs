//! Retrying Condition Evaluator
//!
//! Repeatedly checks a condition until it is satisfied, the deadline passes
//! or the caller cancels. Checks never overlap; the only suspension point
//! owned by the evaluator is the wait between checks.
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: Stop at the deadline and report expected vs received
//! - **Muda**: Wake at the deadline instead of sleeping out a long interval

use crate::condition::{Condition, Failure, FnCondition};
use crate::config::{EvaluateOptions, EvaluatorConfig};
use crate::expect::{to_pass, Poll};
use crate::outcome::EvaluationOutcome;
use crate::result::EsperarResult;
use crate::session::EvaluationSession;
use std::fmt::Debug;
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::Instrument;

/// Abort reason reported when the cancellation token fires
pub const CANCELLED_REASON: &str = "cancellation requested";

// =============================================================================
// EVALUATION ENTRY POINTS
// =============================================================================

/// Check `condition` until it succeeds, the timeout elapses or the caller cancels
///
/// Any successful check satisfies the condition.
///
/// # Errors
///
/// Returns a configuration error, without checking the condition, if the
/// options are invalid. Timeouts and aborts are outcomes, not errors.
pub async fn evaluate<C>(
    condition: C,
    options: &EvaluateOptions,
) -> EsperarResult<EvaluationOutcome<C::Output>>
where
    C: Condition,
{
    run(condition, options, |_| Ok(())).await
}

/// Like [`evaluate`], but a value only counts when `is_satisfied` accepts it
///
/// A rejected value is retried like a failed check; its `Debug` rendering
/// becomes the failure's received state.
pub async fn evaluate_until<C, P>(
    condition: C,
    mut is_satisfied: P,
    options: &EvaluateOptions,
) -> EsperarResult<EvaluationOutcome<C::Output>>
where
    C: Condition,
    C::Output: Debug,
    P: FnMut(&C::Output) -> bool,
{
    let expected = condition.description();
    run(condition, options, move |value| {
        if is_satisfied(value) {
            Ok(())
        } else {
            Err(Failure::new("predicate not satisfied")
                .with_expected(expected.clone())
                .with_received(format!("{value:?}")))
        }
    })
    .await
}

/// Poll an async closure and return its first `Ok` value
///
/// # Errors
///
/// Returns a configuration, timeout or aborted error.
pub async fn poll_until<F, Fut, T, E>(func: F, options: &EvaluateOptions) -> EsperarResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    evaluate(FnCondition::new(func), options)
        .await?
        .into_result()
}

/// Shared loop; `judge` decides whether a returned value is acceptable
pub(crate) async fn run<C, J>(
    condition: C,
    options: &EvaluateOptions,
    judge: J,
) -> EsperarResult<EvaluationOutcome<C::Output>>
where
    C: Condition,
    J: FnMut(&C::Output) -> Result<(), Failure>,
{
    let (timeout, schedule) = options.validate()?;
    let session = EvaluationSession::new(condition.description(), timeout, schedule);
    let span = tracing::debug_span!(
        "evaluate",
        session = %session.id(),
        description = %session.description(),
        timeout_ms = timeout.as_millis() as u64,
    );
    Ok(drive(condition, options, judge, session)
        .instrument(span)
        .await)
}

async fn drive<C, J>(
    mut condition: C,
    options: &EvaluateOptions,
    mut judge: J,
    mut session: EvaluationSession,
) -> EvaluationOutcome<C::Output>
where
    C: Condition,
    J: FnMut(&C::Output) -> Result<(), Failure>,
{
    let start = Instant::now();
    loop {
        if options.is_cancelled() {
            tracing::info!(attempts = session.attempts(), "evaluation aborted");
            return session.aborted(CANCELLED_REASON, start.elapsed());
        }
        if session.is_expired(start.elapsed()) {
            tracing::warn!(
                attempts = session.attempts(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                last_failure = ?session.last_failure().map(|f| f.message.as_str()),
                "evaluation timed out"
            );
            return session.timed_out(start.elapsed());
        }

        session.begin_attempt();
        let checked = condition
            .check()
            .await
            .and_then(|value| judge(&value).map(|()| value));
        match checked {
            Ok(value) => {
                tracing::debug!(attempts = session.attempts(), "condition satisfied");
                return session.satisfied(value, start.elapsed());
            }
            Err(failure) => {
                tracing::debug!(
                    attempt = session.attempts(),
                    failure = %failure.message,
                    "condition not satisfied"
                );
                session.record_failure(failure);
            }
        }

        let Some(wait) = session.next_wait(start.elapsed()) else {
            continue;
        };
        tracing::trace!(wait_ms = wait.as_millis() as u64, "waiting before next check");
        match options.cancel.as_ref() {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => {}
                    () = sleep(wait) => {}
                }
            }
            None => sleep(wait).await,
        }
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Entry point that applies project-wide defaults
///
/// Options are resolved from the config once, when the evaluator is built.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluatorConfig,
    assertion: EvaluateOptions,
    polling: EvaluateOptions,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            config: EvaluatorConfig::default(),
            assertion: EvaluateOptions::assertion(),
            polling: EvaluateOptions::polling(),
        }
    }
}

impl Evaluator {
    /// Create an evaluator with default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator from a config
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid
    pub fn with_config(config: EvaluatorConfig) -> EsperarResult<Self> {
        config.validate()?;
        Ok(Self {
            assertion: config.assertion_options()?,
            polling: config.poll_options()?,
            config,
        })
    }

    /// The active config
    #[must_use]
    pub const fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Wait for a condition using assertion defaults
    pub async fn wait_for<C: Condition>(&self, condition: C) -> EsperarResult<C::Output> {
        evaluate(condition, &self.assertion).await?.into_result()
    }

    /// Start a polling matcher using polling defaults
    pub fn poll<F>(&self, fetch: F) -> Poll<F> {
        Poll::new(fetch).with_options(self.polling.clone())
    }

    /// Retry a fallible block using polling defaults
    pub async fn to_pass<F, Fut, T, E>(&self, block: F) -> EsperarResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        to_pass(block, &self.polling).await
    }
}
