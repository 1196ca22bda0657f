//! Esperar: Deadline-Bounded Conditions for Rust Test Suites
//!
//! Esperar (Spanish: "to wait/to expect") re-checks a condition until it is
//! satisfied, a timeout elapses or the caller cancels. It is the engine
//! behind auto-retrying assertions, polling matchers and "wait until"
//! helpers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ESPERAR Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Condition  │    │ Evaluation │    │ Outcome    │            │
//! │   │ / Poll /   │───►│ Session +  │───►│ Satisfied  │            │
//! │   │ to_pass    │    │ Schedule   │    │ TimedOut   │            │
//! │   └────────────┘    └────────────┘    │ Aborted    │            │
//! │                                       └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use esperar::prelude::*;
//!
//! let options = EvaluateOptions::assertion().with_timeout_ms(2_000);
//! let count = evaluate(condition_fn(|| async { read_counter().await }), &options)
//!     .await?
//!     .into_result()?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod blocking;
mod condition;
mod config;
mod evaluator;
mod expect;
pub mod logging;
mod outcome;
mod result;
mod schedule;
mod session;
mod soft;

pub use blocking::{
    evaluate_blocking, retry_contains, retry_eq, retry_some, retry_true, RetryAssertion,
    CANCEL_POLL_SLICE,
};
pub use condition::{condition_fn, sync_condition, Condition, Failure, FnCondition, SyncCondition};
pub use config::{
    EvaluateOptions, EvaluatorConfig, DEFAULT_ASSERTION_TIMEOUT_MS, DEFAULT_POLL_TIMEOUT_MS,
    DEFAULT_TEST_TIMEOUT_MS,
};
pub use evaluator::{evaluate, evaluate_until, poll_until, Evaluator, CANCELLED_REASON};
pub use expect::{to_pass, Poll};
pub use outcome::{EvaluationOutcome, EvaluationReport, OutcomeStatus};
pub use result::{EsperarError, EsperarResult};
pub use schedule::{RetrySchedule, DEFAULT_INTERVAL_MS, POLLING_INTERVALS_MS};
pub use session::EvaluationSession;
pub use soft::{SoftFailure, SoftMode, SoftWaits};

/// Cancellation signal accepted by [`EvaluateOptions::with_cancel`]
pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::blocking::*;
    pub use super::condition::*;
    pub use super::config::*;
    pub use super::evaluator::*;
    pub use super::expect::*;
    pub use super::outcome::*;
    pub use super::result::*;
    pub use super::schedule::*;
    pub use super::soft::*;
    pub use super::CancellationToken;
}
