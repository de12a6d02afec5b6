//! Content store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feedsync_bench::{news_batch, topic_batch};
use feedsync_core::{ContentStore, Database, StoreConfig};
use feedsync_storage::InMemoryBackend;

/// Benchmark applying news resource batches of varying size.
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for count in [10, 40, 400].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let db = Database::open_in_memory().unwrap();
            db.content().atomic_apply(&topic_batch(50, 1)).unwrap();
            let mut cursor = 0;

            b.iter(|| {
                cursor += 1;
                let batch = news_batch(count, 50, cursor);
                db.content().atomic_apply(black_box(&batch)).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark applying to an on-disk store with fsync per commit.
fn bench_apply_durable(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path(), StoreConfig::default()).unwrap();
    let mut cursor = 0;

    c.bench_function("apply_durable_40", |b| {
        b.iter(|| {
            cursor += 1;
            db.content()
                .atomic_apply(black_box(&news_batch(40, 20, cursor)))
                .unwrap();
        });
    });
}

/// Benchmark journal replay on open.
fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");

    for units in [10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*units as u64));
        group.bench_with_input(BenchmarkId::from_parameter(units), units, |b, &units| {
            let backend = InMemoryBackend::new();
            let config = StoreConfig::default();
            {
                let store = ContentStore::open(Box::new(backend.clone()), &config).unwrap();
                for cursor in 1..=units {
                    store.atomic_apply(&news_batch(10, 20, cursor)).unwrap();
                }
            }

            b.iter(|| {
                let store = ContentStore::open(Box::new(backend.clone()), &config).unwrap();
                black_box(store.snapshot());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply, bench_apply_durable, bench_recover);
criterion_main!(benches);
