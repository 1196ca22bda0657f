//! Evaluator Operations Benchmarks
//!
//! Benchmarks for schedule lookup, session bookkeeping and immediate-success
//! evaluation overhead.
//!
//! Run with: `cargo bench --bench evaluator_ops`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use esperar::{
    evaluate, evaluate_blocking, sync_condition, EvaluateOptions, EvaluationSession, Failure,
    RetrySchedule,
};
use std::time::Duration;

fn bench_schedule_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_lookup");

    let schedules = vec![
        (vec![100], "fixed"),
        (vec![100, 250, 500, 1000], "polling"),
        ((1..=64).map(|i| i * 10).collect::<Vec<u64>>(), "64_steps"),
    ];

    for (millis, name) in schedules {
        let schedule = RetrySchedule::from_millis(&millis).expect("valid schedule");
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &schedule,
            |bench, schedule| {
                bench.iter(|| {
                    for retry in 0..128 {
                        black_box(schedule.delay_for_retry(black_box(retry)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_session_waits(c: &mut Criterion) {
    c.bench_function("session_next_wait_100_attempts", |bench| {
        bench.iter(|| {
            let mut session = EvaluationSession::new(
                "bench",
                Duration::from_secs(30),
                RetrySchedule::polling(),
            );
            for i in 0..100u64 {
                session.begin_attempt();
                session.record_failure(Failure::new("not ready"));
                black_box(session.next_wait(Duration::from_millis(i * 10)));
            }
            black_box(session);
        });
    });
}

fn bench_immediate_success(c: &mut Criterion) {
    let mut group = c.benchmark_group("immediate_success");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let options = EvaluateOptions::assertion();
    let options = &options;

    group.bench_function("async", |bench| {
        bench.to_async(&runtime).iter(|| async move {
            let outcome = evaluate(sync_condition(|| Ok::<_, Failure>(1)), options).await;
            black_box(outcome)
        });
    });

    group.bench_function("blocking", |bench| {
        bench.iter(|| black_box(evaluate_blocking(|| Ok::<_, Failure>(1), options)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_schedule_lookup,
    bench_session_waits,
    bench_immediate_success
);
criterion_main!(benches);
