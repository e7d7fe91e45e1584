//! Throughput benchmarks for the hot paths and the elapse loop.
//!
//! Run with:
//!     cargo bench --bench throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickcache::{Cache, CacheBuilder};

/// Number of entries each cache is pre-filled with.
const CAP: u64 = 10_000;

/// Operations executed per criterion iteration (hot-loop size).
const OPS: u64 = 1_000;

fn filled(extend_on_get: bool) -> Cache<u64, u64> {
    let cache: Cache<u64, u64> = CacheBuilder::new()
        .default_ttl(u64::MAX / 2)
        .extend_on_get(extend_on_get)
        .build();
    for i in 0..CAP {
        cache.set(i, i * 2);
    }
    cache
}

// ---------------------------------------------------------------------------
// Group 1: get_hit
// ---------------------------------------------------------------------------
// All keys are present.  Compares the shared-lock read against the
// exclusive-lock read that resets the entry's age.

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    group.throughput(Throughput::Elements(OPS));

    for extend in [false, true] {
        let cache = filled(extend);
        let name = if extend { "extend_on_get" } else { "read_only" };
        group.bench_function(name, |b| {
            b.iter(|| {
                for i in 0..OPS {
                    black_box(cache.get(black_box(&i)));
                }
            })
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Group 2: set_overwrite
// ---------------------------------------------------------------------------
// Overwrites of present keys, each relocating the node in the wheel.

fn bench_set_overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_overwrite");
    group.throughput(Throughput::Elements(OPS));

    let cache = filled(false);
    let mut ttl = 1_000u64;
    group.bench_function("relocate", |b| {
        b.iter(|| {
            ttl += 1;
            for i in 0..OPS {
                cache.set_with_ttl(black_box(i), i, ttl);
            }
        })
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Group 3: elapse
// ---------------------------------------------------------------------------
// Fill a cache whose entries are spread over `spread` deadlines, then let
// them all expire.  Cost should track the number of entries, not ticks.

fn bench_elapse(c: &mut Criterion) {
    let mut group = c.benchmark_group("elapse");
    group.throughput(Throughput::Elements(CAP));

    for spread in [1u64, 64, 4_096] {
        group.bench_with_input(BenchmarkId::new("expire_all", spread), &spread, |b, &spread| {
            b.iter_batched(
                || {
                    let cache: Cache<u64, u64> = CacheBuilder::new().build();
                    for i in 0..CAP {
                        cache.set_with_ttl(i, i, 1 + i % spread);
                    }
                    cache
                },
                |cache| {
                    cache.elapse(spread);
                    black_box(cache.len())
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.bench_function("hook_extend_once", |b| {
        b.iter_batched(
            || {
                let cache: Cache<u64, u64> = CacheBuilder::new().default_ttl(1).build();
                cache.set_hook(|_, v| if v % 2 == 0 { 1 } else { 0 });
                for i in 0..CAP {
                    cache.set(i, i);
                }
                cache
            },
            |cache| {
                cache.elapse(1);
                black_box(cache.len())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_get_hit, bench_set_overwrite, bench_elapse);
criterion_main!(benches);
