/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use criterion::{BenchmarkId, Criterion, black_box};
use rand::{Rng, SeedableRng, rngs::StdRng};
use vsearch::{
    flat::{self, FlatParams, Strategy},
    utils::create_thread_pool,
};
use vsearch_utils::views::{Init, Matrix};

const NUM_POINTS: usize = 20_000;
const NUM_QUERIES: usize = 64;
const DIM: usize = 128;
const K: usize = 10;

pub fn benchmark_flat_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let dataset = Matrix::new(Init(|| rng.random_range(-1.0f32..1.0)), NUM_POINTS, DIM);
    let queries = Matrix::new(Init(|| rng.random_range(-1.0f32..1.0)), NUM_QUERIES, DIM);

    let mut group = c.benchmark_group("flat-search");
    group.sample_size(10);

    for nthreads in [1, 4] {
        let pool = create_thread_pool(nthreads).unwrap();
        for strategy in [Strategy::QueryParallel, Strategy::DatasetParallel] {
            let params = FlatParams::new(K).unwrap().with_strategy(strategy);
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), nthreads),
                &nthreads,
                |f, _| {
                    f.iter(|| {
                        flat::search(
                            black_box(dataset.as_view()),
                            black_box(queries.as_view()),
                            &params,
                            &pool,
                        )
                        .unwrap()
                    })
                },
            );
        }
    }
}
