//! Conditions polled by the evaluator.
//!
//! A condition is anything that can be checked repeatedly: a DOM query, a
//! text comparison, a network probe or an arbitrary async block. Each check
//! either yields a value or a [`Failure`] that says why it is not satisfied
//! yet. Every failure is transient from the evaluator's point of view.

use futures::future::{MapErr, TryFutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::{ready, Future, Ready};

// =============================================================================
// FAILURE DETAIL
// =============================================================================

/// Why a single condition check was not satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Human-readable message
    pub message: String,
    /// Expected state, when the check compares against one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Last observed state, when the check observed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

impl Failure {
    /// Create a failure with a message only
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: None,
            received: None,
        }
    }

    /// Create a failure for a value that did not match the expected state
    #[must_use]
    pub fn mismatch(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            message: "value did not match".to_string(),
            expected: Some(expected.into()),
            received: Some(received.into()),
        }
    }

    /// Set the expected state
    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Set the received state
    #[must_use]
    pub fn with_received(mut self, received: impl Into<String>) -> Self {
        self.received = Some(received.into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref expected) = self.expected {
            write!(f, "\n  Expected: {expected}")?;
        }
        if let Some(ref received) = self.received {
            write!(f, "\n  Received: {received}")?;
        }
        Ok(())
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Failure {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::new(err.to_string())
    }
}

// =============================================================================
// CONDITION TRAIT
// =============================================================================

/// Something the evaluator can check repeatedly
///
/// Checks must be safe to repeat. The evaluator never caches or deduplicates
/// the side effects of a check.
pub trait Condition {
    /// Value produced when the check succeeds
    type Output;

    /// Future returned by a single check
    type Future: Future<Output = Result<Self::Output, Failure>>;

    /// Run the check once
    fn check(&mut self) -> Self::Future;

    /// Description used in failure messages
    fn description(&self) -> String {
        "condition".to_string()
    }
}

impl<C: Condition + ?Sized> Condition for &mut C {
    type Output = C::Output;
    type Future = C::Future;

    fn check(&mut self) -> Self::Future {
        (**self).check()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

// =============================================================================
// CLOSURE ADAPTERS
// =============================================================================

/// A condition backed by an async closure
pub struct FnCondition<F> {
    func: F,
    description: String,
}

impl<F> FnCondition<F> {
    /// Wrap an async closure
    pub fn new(func: F) -> Self {
        Self {
            func,
            description: "condition".to_string(),
        }
    }

    /// Describe what the closure waits for
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F> fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, T, E> Condition for FnCondition<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    type Output = T;
    type Future = MapErr<Fut, fn(E) -> Failure>;

    fn check(&mut self) -> Self::Future {
        (self.func)().map_err(<E as Into<Failure>>::into as fn(E) -> Failure)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// A condition backed by a synchronous closure
pub struct SyncCondition<F> {
    func: F,
    description: String,
}

impl<F> SyncCondition<F> {
    /// Wrap a synchronous closure
    pub fn new(func: F) -> Self {
        Self {
            func,
            description: "condition".to_string(),
        }
    }

    /// Describe what the closure waits for
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F> fmt::Debug for SyncCondition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F, T, E> Condition for SyncCondition<F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<Failure>,
{
    type Output = T;
    type Future = Ready<Result<T, Failure>>;

    fn check(&mut self) -> Self::Future {
        ready((self.func)().map_err(Into::into))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Shorthand for [`FnCondition::new`]
pub fn condition_fn<F, Fut, T, E>(func: F) -> FnCondition<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    FnCondition::new(func)
}

/// Shorthand for [`SyncCondition::new`]
pub fn sync_condition<F, T, E>(func: F) -> SyncCondition<F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<Failure>,
{
    SyncCondition::new(func)
}
