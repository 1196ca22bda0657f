//! Subscriber setup for evaluation logs.
//!
//! Evaluations emit `tracing` events under an `evaluate` span; nothing is
//! printed until a subscriber is installed. `RUST_LOG` overrides the
//! directive passed here.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when neither `RUST_LOG` nor the caller provide one
pub const DEFAULT_DIRECTIVE: &str = "esperar=info";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable subscriber writing to stdout
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Install a human-readable subscriber whose output libtest captures
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(fmt::layer().with_target(true).with_test_writer())
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber for CI log collection
pub fn init_json_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(fmt::layer().json().with_current_span(true))
        .try_init()
        .is_ok()
}
