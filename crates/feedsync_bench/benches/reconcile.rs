//! Change list reconciliation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feedsync_bench::random_change_list;
use feedsync_engine::reconcile;
use std::collections::BTreeSet;

/// Benchmark reconciliation against a half-populated store.
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for len in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let distinct = len / 2;
            let local: BTreeSet<String> = (0..distinct / 2).map(|n| n.to_string()).collect();
            let items = random_change_list(len, distinct, 1_000);

            b.iter(|| reconcile(black_box(&local), black_box(&items), 1_000).unwrap());
        });
    }
    group.finish();
}

/// Benchmark reconciliation of lists where every id repeats.
fn bench_reconcile_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_duplicates");

    for distinct in [1, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(distinct),
            distinct,
            |b, &distinct| {
                let items = random_change_list(1_000, distinct, 0);
                let local = BTreeSet::new();

                b.iter(|| reconcile(black_box(&local), black_box(&items), 0).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_reconcile, bench_reconcile_duplicates);
criterion_main!(benches);
