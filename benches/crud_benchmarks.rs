//! CRUD and positional-access benchmarks for the ranked containers, with
//! `std::collections::BTreeMap` as the baseline where an equivalent operation
//! exists.

use std::collections::BTreeMap;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ranked_btree::{RankedMap, RankedMultiMap};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

/// Keys shuffled deterministically so every run inserts in the same "random"
/// order without pulling in an RNG.
fn shuffled_keys(n: usize) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n as u64).collect();
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    for i in (1..keys.len()).rev() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        keys.swap(i, j);
    }
    keys
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in SIZES {
        let keys = shuffled_keys(size);

        group.bench_with_input(BenchmarkId::new("RankedMap", size), &keys, |b, keys| {
            b.iter_batched(
                RankedMap::new,
                |mut map| {
                    for &key in keys {
                        map.insert(key, key);
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter_batched(
                BTreeMap::new,
                |mut map| {
                    for &key in keys {
                        map.insert(key, key);
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("RankedMap/hinted_append", size), &keys, |b, keys| {
            b.iter_batched(
                RankedMap::new,
                |mut map| {
                    // Sorted append with an end hint skips the descent.
                    for key in 0..keys.len() as u64 {
                        map.insert_hint(map.len(), key, key);
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for size in SIZES {
        let keys = shuffled_keys(size);
        let ranked: RankedMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        let btree: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

        group.bench_with_input(BenchmarkId::new("RankedMap", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(ranked.get(key));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(btree.get(key));
                }
            });
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for size in SIZES {
        let keys = shuffled_keys(size);

        group.bench_with_input(BenchmarkId::new("RankedMap", size), &keys, |b, keys| {
            b.iter_batched(
                || keys.iter().map(|&k| (k, k)).collect::<RankedMap<u64, u64>>(),
                |mut map| {
                    for key in keys {
                        black_box(map.remove(key));
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter_batched(
                || keys.iter().map(|&k| (k, k)).collect::<BTreeMap<u64, u64>>(),
                |mut map| {
                    for key in keys {
                        black_box(map.remove(key));
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_rank_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_access");
    for size in SIZES {
        let keys = shuffled_keys(size);
        let ranked: RankedMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

        group.bench_with_input(BenchmarkId::new("get_by_rank", size), &size, |b, &size| {
            b.iter(|| {
                for rank in (0..size).step_by(7) {
                    black_box(ranked.get_by_rank(rank));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("rank", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(ranked.rank(key));
                }
            });
        });

        // The baseline for positional access on a standard map is a linear
        // scan through the iterator.
        let btree: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_with_input(BenchmarkId::new("BTreeMap/nth", size), &size, |b, &size| {
            b.iter(|| {
                for rank in (0..size).step_by(size / 16 + 1) {
                    black_box(btree.iter().nth(rank));
                }
            });
        });
    }
    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    for size in SIZES {
        let keys = shuffled_keys(size);
        let ranked: RankedMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        let multi: RankedMultiMap<u64, u64> = keys.iter().map(|&k| (k / 4, k)).collect();

        group.bench_with_input(BenchmarkId::new("RankedMap", size), &size, |b, _| {
            b.iter(|| {
                let mut total = 0u64;
                for (&k, &v) in &ranked {
                    total = total.wrapping_add(k).wrapping_add(v);
                }
                black_box(total)
            });
        });

        group.bench_with_input(BenchmarkId::new("RankedMultiMap", size), &size, |b, _| {
            b.iter(|| {
                let mut total = 0u64;
                for (&k, &v) in &multi {
                    total = total.wrapping_add(k).wrapping_add(v);
                }
                black_box(total)
            });
        });

        group.bench_with_input(BenchmarkId::new("RankedMap/slice_middle", size), &size, |b, _| {
            b.iter(|| {
                let mut total = 0u64;
                for (&k, _) in ranked.slice(-64, 0) {
                    total = total.wrapping_add(k);
                }
                black_box(total)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_remove, bench_rank_access, bench_iterate);
criterion_main!(benches);
