//! Performance benchmarks for BatchLoader coalescing and deduplication.
//!
//! Run with: cargo bench -p rsloader-core
//!
//! These benchmarks measure:
//! - Throughput of `load_many` with varying duplicate ratios (0%, 25%, 50%, 75%)
//! - How throughput scales with `max_batch_size`
//! - Cache hit cost compared to a full fetch round trip

use std::convert::Infallible;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use rsloader_core::{batch_fn, BatchFn, BatchLoader, LoaderConfig};

// =============================================================================
// Setup helpers
// =============================================================================

/// In-memory fetch function that squares every key.
fn squaring_fetcher() -> impl BatchFn<u64, u64, Error = Infallible> {
    batch_fn(|keys: Vec<u64>| async move {
        Ok::<_, Infallible>(
            keys.into_iter()
                .map(|key| Ok::<_, Infallible>(key * key))
                .collect::<Vec<_>>(),
        )
    })
}

/// Generate keys with a specified duplicate ratio.
///
/// # Arguments
/// * `count` - Total number of keys
/// * `duplicate_ratio` - Ratio of duplicates (0.0 = no duplicates, 1.0 = all same)
fn generate_keys_with_duplicates(count: usize, duplicate_ratio: f64) -> Vec<u64> {
    let unique_count = ((1.0 - duplicate_ratio) * count as f64).ceil() as usize;
    let unique_count = unique_count.max(1);

    (0..count).map(|i| (i % unique_count) as u64).collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

/// Benchmark `load_many` on a fresh loader with varying duplicate ratios.
fn bench_load_many_deduplication(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let key_count = 100;

    let mut group = c.benchmark_group("load_many_deduplication");
    group.throughput(Throughput::Elements(key_count as u64));

    for (label, ratio) in [
        ("0%_duplicates", 0.0),
        ("25%_duplicates", 0.25),
        ("50%_duplicates", 0.50),
        ("75%_duplicates", 0.75),
    ] {
        let keys = generate_keys_with_duplicates(key_count, ratio);

        group.bench_with_input(BenchmarkId::new("throughput", label), &keys, |b, keys| {
            b.to_async(&rt).iter(|| async {
                let loader = BatchLoader::new(squaring_fetcher());
                let results = loader.load_many(black_box(keys.clone())).await;
                black_box(results)
            })
        });
    }

    group.finish();
}

/// Benchmark how `max_batch_size` affects throughput for a fixed key set.
fn bench_max_batch_size_scaling(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let keys = generate_keys_with_duplicates(200, 0.0);

    let mut group = c.benchmark_group("max_batch_size_scaling");
    group.throughput(Throughput::Elements(keys.len() as u64));

    for max_batch_size in [10, 50, 200] {
        let config = LoaderConfig::default().with_max_batch_size(max_batch_size);

        group.bench_with_input(
            BenchmarkId::from_parameter(max_batch_size),
            &keys,
            |b, keys| {
                b.to_async(&rt).iter(|| async {
                    let loader =
                        BatchLoader::with_config(squaring_fetcher(), config.clone()).unwrap();
                    let results = loader.load_many(black_box(keys.clone())).await;
                    black_box(results)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark a warm cache against a cold loader.
fn bench_cache_hits(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let keys = generate_keys_with_duplicates(100, 0.0);

    let warm = BatchLoader::new(squaring_fetcher());
    rt.block_on(warm.load_many(keys.clone()));

    let mut group = c.benchmark_group("cache_hits");
    group.throughput(Throughput::Elements(keys.len() as u64));

    group.bench_function("warm", |b| {
        b.to_async(&rt).iter(|| async {
            let results = warm.load_many(black_box(keys.clone())).await;
            black_box(results)
        })
    });

    group.bench_function("cold", |b| {
        b.to_async(&rt).iter(|| async {
            let loader = BatchLoader::new(squaring_fetcher());
            let results = loader.load_many(black_box(keys.clone())).await;
            black_box(results)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_load_many_deduplication,
    bench_max_batch_size_scaling,
    bench_cache_hits,
);
criterion_main!(benches);
