//! Throughput benchmarks: Cortado vs Moka vs QuickCache.
//!
//! Each group replays the same keyed workload against all three caches so
//! criterion can generate side-by-side reports.
//!
//! Run with:
//!     cargo bench --bench throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use moka::sync::Cache as MokaCache;
use quick_cache::sync::Cache as QuickCache;

use cortado::CacheBuilder;

/// Number of entries each cache is pre-filled with and its logical capacity.
const CAP: usize = 10_000;

/// Operations executed per criterion iteration (hot-loop size).
const OPS: usize = 1_000;

fn keys() -> Vec<String> {
    (0..CAP).map(|i| format!("key-{i}")).collect()
}

// ---------------------------------------------------------------------------
// Group 1: get_hit
// ---------------------------------------------------------------------------
// All keys are present → measures pure read throughput with no eviction.

fn bench_get_hit(c: &mut Criterion) {
    let keys = keys();

    let cortado: cortado::Cache<usize> = CacheBuilder::new(CAP).build();
    for (i, k) in keys.iter().enumerate() {
        cortado.set(k, i);
    }

    let moka: MokaCache<String, usize> = MokaCache::new(CAP as u64);
    for (i, k) in keys.iter().enumerate() {
        moka.insert(k.clone(), i);
    }

    let qc: QuickCache<String, usize> = QuickCache::new(CAP);
    for (i, k) in keys.iter().enumerate() {
        qc.insert(k.clone(), i);
    }

    let mut group = c.benchmark_group("get_hit");
    group.throughput(Throughput::Elements(OPS as u64));

    group.bench_function("cortado", |b| {
        b.iter(|| {
            for k in keys.iter().take(OPS) {
                black_box(cortado.get(k));
            }
        })
    });
    group.bench_function("moka", |b| {
        b.iter(|| {
            for k in keys.iter().take(OPS) {
                black_box(moka.get(k));
            }
        })
    });
    group.bench_function("quick_cache", |b| {
        b.iter(|| {
            for k in keys.iter().take(OPS) {
                black_box(qc.get(k));
            }
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Group 2: insert_churn
// ---------------------------------------------------------------------------
// Inserts past capacity → measures write throughput under eviction
// pressure (and, for cortado, directory growth).

fn bench_insert_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_churn");
    group.throughput(Throughput::Elements(OPS as u64));

    group.bench_function("cortado", |b| {
        let cache: cortado::Cache<usize> = CacheBuilder::new(CAP / 10).build();
        let mut next = 0usize;
        b.iter(|| {
            for _ in 0..OPS {
                cache.set(&format!("key-{next}"), next);
                next += 1;
            }
        })
    });
    group.bench_function("moka", |b| {
        let cache: MokaCache<String, usize> = MokaCache::new((CAP / 10) as u64);
        let mut next = 0usize;
        b.iter(|| {
            for _ in 0..OPS {
                cache.insert(format!("key-{next}"), next);
                next += 1;
            }
        })
    });
    group.bench_function("quick_cache", |b| {
        let cache: QuickCache<String, usize> = QuickCache::new(CAP / 10);
        let mut next = 0usize;
        b.iter(|| {
            for _ in 0..OPS {
                cache.insert(format!("key-{next}"), next);
                next += 1;
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_get_hit, bench_insert_churn);
criterion_main!(benches);
