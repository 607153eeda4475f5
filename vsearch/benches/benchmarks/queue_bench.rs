/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::time::Duration;

use criterion::{BenchmarkGroup, BenchmarkId, Criterion, black_box, measurement::Measurement};
use rand::{
    SeedableRng,
    distr::{Distribution, Uniform},
    rngs::StdRng,
};
use vsearch::neighbor::TopKQueue;

fn bench_queue_for_size<T: Measurement>(group: &mut BenchmarkGroup<T>, size: usize) {
    group.bench_with_input(BenchmarkId::new("insert", size), &size, |f, &k| {
        let distances = generate_distances(100_000);
        let mut queue = TopKQueue::new(k);
        f.iter(|| {
            queue.clear();
            for (id, &d) in black_box(distances.iter().enumerate()) {
                queue.insert(id as u64, d);
            }
            black_box(&queue);
        });
    });
}

pub fn benchmark_top_k_queue_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("topkqueue");
    group
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);

    for k in [1, 10, 100, 1000] {
        bench_queue_for_size(&mut group, k);
    }
}

fn generate_distances(count: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let range = Uniform::new(0.0, 1000.0).unwrap();
    (0..count).map(|_| range.sample(&mut rng)).collect()
}
