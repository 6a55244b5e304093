//! Resilience benchmarks
//!
//! - Breaker admission overhead on the closed fast path and the open reject path
//! - Worker pool submission throughput
//!
//! Run with: `cargo bench -p boxoffice-runtime`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use boxoffice_runtime::{CircuitBreaker, CircuitBreakerConfig, Job, WorkerPool, WorkerPoolConfig};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn bench_breaker_admission(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let mut group = c.benchmark_group("circuit_breaker");
    group.throughput(Throughput::Elements(1));

    let closed = CircuitBreaker::new("bench_closed", CircuitBreakerConfig::default());
    group.bench_function("closed_pass_through", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(closed.call(|| async { Ok::<_, String>(1_u32) }).await)
        });
    });

    let open = CircuitBreaker::new(
        "bench_open",
        CircuitBreakerConfig::builder()
            .max_failures(1)
            .open_timeout(Duration::from_secs(3_600))
            .build(),
    );
    runtime.block_on(async {
        let _ = open.call(|| async { Err::<u32, _>("trip") }).await;
    });
    group.bench_function("open_reject", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(open.call(|| async { Ok::<_, String>(1_u32) }).await)
        });
    });

    group.finish();
}

fn bench_pool_submit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let pool = runtime.block_on(async {
        WorkerPool::start(WorkerPoolConfig {
            workers: 4,
            queue_capacity: 65_536,
            results_capacity: 16,
        })
    });

    let mut group = c.benchmark_group("worker_pool");
    group.throughput(Throughput::Elements(1));
    group.bench_function("submit_noop", |b| {
        b.iter(|| black_box(pool.submit(Job::new("noop", async { Ok::<_, String>(()) }))));
    });
    group.finish();

    runtime
        .block_on(pool.stop(Duration::from_secs(5)))
        .expect("Worker pool should stop");
}

criterion_group!(benches, bench_breaker_admission, bench_pool_submit);
criterion_main!(benches);
