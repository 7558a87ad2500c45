//! Performance benchmarks for diagnostic chains and pipeline driving
//! Covers merge cost as chains grow and the per-step overhead of the driver

use cascade::{map, Diagnostic, DiagnosticFactory, Done, Next, Waterfall};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn build_chain(factory: &DiagnosticFactory, size: usize) -> Diagnostic {
    (0..size).fold(Diagnostic::none(), |chain, i| {
        let status = if i % 7 == 0 { 404 } else { 200 };
        Diagnostic::merge(chain, factory.record(status, format!("record {}", i)))
    })
}

/// Benchmark folding single records onto a growing chain
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let factory = DiagnosticFactory::default();

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("fold_records", size), &size, |b, &size| {
            b.iter(|| black_box(build_chain(&factory, size)));
        });

        // Chain-on-chain: the older chain is attached below the newer one's tail
        group.bench_with_input(BenchmarkId::new("chain_on_chain", size), &size, |b, &size| {
            b.iter_batched(
                || (build_chain(&factory, size), build_chain(&factory, size)),
                |(prev, next)| black_box(Diagnostic::merge(prev, next)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark worst-status traversal
fn bench_highest_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("highest_level");
    let factory = DiagnosticFactory::default();

    for size in [10, 100, 1000, 10000] {
        let chain = build_chain(&factory, size);
        group.bench_with_input(BenchmarkId::new("traverse", size), &chain, |b, chain| {
            b.iter(|| black_box(chain.highest_level()));
        });
    }

    group.finish();
}

/// Benchmark driver overhead for synchronous steps
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => panic!("failed to build runtime: {}", err),
    };

    for steps in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("waterfall", steps), &steps, |b, &steps| {
            b.to_async(&runtime).iter(|| async move {
                let pipeline = (0..steps).fold(Waterfall::new(), |pipeline, _| {
                    pipeline.step(|_ctx, next: Next, _args| async move { next.done() })
                });
                black_box(pipeline.run().await)
            });
        });

        group.bench_with_input(BenchmarkId::new("map", steps), &steps, |b, &steps| {
            b.to_async(&runtime).iter(|| async move {
                let items: Vec<usize> = (0..steps).collect();
                black_box(
                    map(items, |_ctx, done: Done<usize>, item: usize, _key| async move {
                        done.ok(item)
                    })
                    .run()
                    .await,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_highest_level, bench_pipeline);

criterion_main!(benches);
