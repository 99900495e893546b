use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use vehpos::{
    brute_force_nearest, dump::generate_records, great_circle_distance, KdTree, PositionRecord,
};

/// -----------------------------
/// Utils
/// -----------------------------

fn random_targets(
    count: usize,
    seed: u64,
) -> Vec<[f64; 2]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| [rng.gen_range(31.0..36.0), rng.gen_range(-103.0..-94.0)])
        .collect()
}

/// Отсортированные по широте записи: худший случай для последовательной
/// вставки.
fn sorted_records(count: usize) -> Vec<PositionRecord> {
    let mut records = generate_records(count, 7);
    records.sort_by(|a, b| a.latitude.total_cmp(&b.latitude));
    records
}

/// -----------------------------
/// Build benchmarks
/// -----------------------------

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for &size in &[1_000, 10_000, 100_000] {
        let records = generate_records(size, 42);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &records, |b, r| {
            b.iter(|| black_box(KdTree::build(r.clone())))
        });
        group.bench_with_input(BenchmarkId::new("balanced", size), &records, |b, r| {
            b.iter(|| black_box(KdTree::bulk_load(r.clone())))
        });
    }

    let sorted = sorted_records(5_000);
    group.bench_function("sequential_sorted_5000", |b| {
        b.iter(|| black_box(KdTree::build(sorted.clone())))
    });

    group.finish();
}

/// -----------------------------
/// Query benchmarks
/// -----------------------------

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");
    let targets = random_targets(256, 1);

    for &size in &[1_000, 10_000, 100_000] {
        let records = generate_records(size, 42);
        let sequential = KdTree::build(records.clone());
        let balanced = KdTree::bulk_load(records.clone());
        group.throughput(Throughput::Elements(targets.len() as u64));

        group.bench_with_input(BenchmarkId::new("kdtree_sequential", size), &sequential, |b, t| {
            b.iter(|| {
                for target in &targets {
                    black_box(t.nearest(*target));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("kdtree_balanced", size), &balanced, |b, t| {
            b.iter(|| {
                for target in &targets {
                    black_box(t.nearest(*target));
                }
            })
        });
        if size <= 10_000 {
            group.bench_with_input(BenchmarkId::new("brute_force", size), &records, |b, r| {
                b.iter(|| {
                    for target in &targets {
                        black_box(brute_force_nearest(r, *target));
                    }
                })
            });
        }
    }

    group.finish();
}

fn bench_haversine(c: &mut Criterion) {
    c.bench_function("great_circle_distance", |b| {
        b.iter(|| {
            great_circle_distance(
                black_box(34.544909),
                black_box(-102.100843),
                black_box(32.345544),
                black_box(-99.123124),
            )
        })
    });
}

criterion_group!(benches, bench_build, bench_nearest, bench_haversine);
criterion_main!(benches);
