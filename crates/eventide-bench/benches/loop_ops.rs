//! Criterion micro-benchmarks for the event loop: microtask drains,
//! promise chains, timer churn, intervals, and async functions.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use eventide_bench::{
    async_pipeline, bench_config, interval_ticks, microtask_flood, promise_chain, timer_churn,
};
use eventide_engine::run_to_completion;

/// Benchmark: drain 10K microtasks queued by the script.
fn bench_microtask_flood_10k(c: &mut Criterion) {
    c.bench_function("microtask_flood_10k", |b| {
        b.iter(|| {
            let report = run_to_completion(bench_config(), microtask_flood(10_000)).unwrap();
            black_box(report.trace.len());
        });
    });
}

/// Benchmark: a 1K-deep `.then` chain.
fn bench_promise_chain_1k(c: &mut Criterion) {
    c.bench_function("promise_chain_1k", |b| {
        b.iter(|| {
            let report = run_to_completion(bench_config(), promise_chain(1_000)).unwrap();
            black_box(&report.trace);
        });
    });
}

/// Benchmark: schedule 10K timeouts and cancel half.
fn bench_timer_churn_10k(c: &mut Criterion) {
    c.bench_function("timer_churn_10k", |b| {
        b.iter(|| {
            let report = run_to_completion(bench_config(), timer_churn(10_000)).unwrap();
            black_box(report.metrics.macrotasks_run);
        });
    });
}

/// Benchmark: one interval firing 10K times.
fn bench_interval_10k(c: &mut Criterion) {
    c.bench_function("interval_ticks_10k", |b| {
        b.iter(|| {
            let report = run_to_completion(bench_config(), interval_ticks(10_000)).unwrap();
            black_box(report.final_time);
        });
    });
}

/// Benchmark: 1K async functions with two awaits each.
fn bench_async_pipeline_1k(c: &mut Criterion) {
    c.bench_function("async_pipeline_1k", |b| {
        b.iter(|| {
            let report = run_to_completion(bench_config(), async_pipeline(1_000)).unwrap();
            black_box(report.trace.len());
        });
    });
}

criterion_group!(
    benches,
    bench_microtask_flood_10k,
    bench_promise_chain_1k,
    bench_timer_churn_10k,
    bench_interval_10k,
    bench_async_pipeline_1k,
);
criterion_main!(benches);
