//! Retry Waits Demo - Deadline-Bounded Conditions
//!
//! Demonstrates the evaluator surfaces:
//! - `evaluate()` with a custom backoff schedule
//! - `Poll` matchers with expected/received failures
//! - `to_pass()` block retries
//! - Cancellation with a `CancellationToken`
//! - Blocking `retry_eq()` for synchronous callers
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=esperar=debug cargo run --example retry_waits -p esperar
//! ```

#![allow(clippy::uninlined_format_args)]

use esperar::logging::{init_tracing, DEFAULT_DIRECTIVE};
use esperar::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> EsperarResult<()> {
    init_tracing(DEFAULT_DIRECTIVE);
    println!("=== Esperar Retry Waits Demo ===\n");

    // Demo 1: Backoff schedule
    demo_backoff().await?;

    // Demo 2: Polling matcher timeout
    demo_poll_timeout().await;

    // Demo 3: Block retries
    demo_to_pass().await?;

    // Demo 4: Cancellation
    demo_cancellation().await?;

    // Demo 5: Blocking retries
    demo_blocking()?;

    println!("\n=== Demo Complete ===");
    Ok(())
}

async fn demo_backoff() -> EsperarResult<()> {
    println!("1. Backoff schedule [50, 100, 200]ms");
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&calls);
    let options = EvaluateOptions::assertion()
        .with_timeout_ms(2_000)
        .with_intervals(RetrySchedule::from_millis(&[50, 100, 200])?);

    let outcome = evaluate(
        sync_condition(move || {
            let n = inner.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= 4 {
                Ok(n)
            } else {
                Err(Failure::mismatch("4 jobs", format!("{n} jobs")))
            }
        })
        .describe("job queue to drain"),
        &options,
    )
    .await?;

    println!(
        "   {} after {} attempts in {:?}",
        outcome.description(),
        outcome.attempts(),
        outcome.elapsed()
    );
    println!("   report: {}", outcome.report().to_json()?);
    Ok(())
}

async fn demo_poll_timeout() {
    println!("\n2. Poll matcher that never matches");
    let result = Poll::new(|| async { "pending" })
        .with_timeout_ms(300)
        .with_message("order status")
        .to_equal("shipped")
        .await;
    if let Err(err) = result {
        println!("   {}", err);
    }
}

async fn demo_to_pass() -> EsperarResult<()> {
    println!("\n3. to_pass() with a flaky health check");
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&calls);
    let body = to_pass(
        move || {
            let n = inner.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Failure::mismatch("200", "503"))
                } else {
                    Ok("ok")
                }
            }
        },
        &EvaluateOptions::polling(),
    )
    .await?;
    println!("   health = {body} after {} calls", calls.load(Ordering::SeqCst));
    Ok(())
}

async fn demo_cancellation() -> EsperarResult<()> {
    println!("\n4. Cancelling a long wait");
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });
    let outcome = evaluate(
        sync_condition(|| Err::<(), _>("modal still open")),
        &EvaluateOptions::test().with_cancel(token),
    )
    .await?;
    println!(
        "   aborted = {} after {:?} ({} attempts)",
        outcome.is_aborted(),
        outcome.elapsed(),
        outcome.attempts()
    );
    Ok(())
}

fn demo_blocking() -> EsperarResult<()> {
    println!("\n5. Blocking retry_eq()");
    let calls = AtomicUsize::new(0);
    let value = retry_eq(|| calls.fetch_add(1, Ordering::SeqCst), 3)
        .with_poll_interval(Duration::from_millis(20))
        .with_description("counter to reach 3")
        .verify()?;
    println!("   counter = {value}");
    Ok(())
}
