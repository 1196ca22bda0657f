//! Result and error types for Esperar.

use crate::condition::Failure;
use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors that can occur in Esperar
///
/// Transient condition failures never appear here; they are kept as the
/// session's last [`Failure`] and only surface inside [`EsperarError::Timeout`].
#[derive(Debug, Error)]
pub enum EsperarError {
    /// Invalid timeout, retry schedule, matcher pattern or config value
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Deadline reached without the condition being satisfied
    #[error(
        "Timed out after {elapsed_ms}ms (timeout {timeout_ms}ms, {attempts} attempt(s)) waiting for {description}: {last_failure}"
    )]
    Timeout {
        /// What was being waited for
        description: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
        /// Time actually spent waiting
        elapsed_ms: u64,
        /// Number of condition invocations
        attempts: usize,
        /// Failure active when the deadline was reached
        last_failure: Failure,
    },

    /// Caller cancelled the wait
    #[error("Aborted waiting for {description} after {attempts} attempt(s): {reason}")]
    Aborted {
        /// What was being waited for
        description: String,
        /// Why the wait stopped
        reason: String,
        /// Number of condition invocations
        attempts: usize,
    },

    /// One or more soft waits failed
    #[error("{count} soft wait(s) failed:\n{summary}")]
    SoftFailures {
        /// Number of failures
        count: usize,
        /// One line per failure
        summary: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl EsperarError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this is a configuration error (raised before any attempt)
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Whether the deadline was reached
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the caller cancelled the wait
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Last transient failure, if this error carries one
    #[must_use]
    pub const fn last_failure(&self) -> Option<&Failure> {
        match self {
            Self::Timeout { last_failure, .. } => Some(last_failure),
            _ => None,
        }
    }
}
