/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! End-to-end checks across the flat engine, IVF assignment and recall.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rstest::rstest;
use vsearch::{
    VSErrorKind,
    flat::{self, FlatParams, Strategy},
    ivf::{self, Partitions},
    recall,
    utils::create_thread_pool_for_test,
};
use vsearch_utils::views::{Init, Layout, Matrix};

fn random_dataset(seed: u64, nrows: usize, ncols: usize) -> Matrix<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Matrix::new(Init(|| rng.random_range(-10.0f32..10.0)), nrows, ncols)
}

/// Every dataset row used as a query must come back as its own nearest neighbor.
#[rstest]
fn queries_find_themselves(#[values(1, 2, 5)] nthreads: usize) {
    let dataset = random_dataset(1, 300, 24);
    let result = flat::query(dataset.as_view(), dataset.as_view(), 4, nthreads).unwrap();

    for q in 0..dataset.nrows() {
        let (ids, distances) = result.row(q);
        assert_eq!(ids[0], q as u64);
        assert_eq!(distances[0], 0.0);
        assert!(distances[1] > 0.0);
    }
}

#[test]
fn results_validate_against_their_own_ground_truth() {
    let dataset = random_dataset(2, 400, 16);
    let queries = random_dataset(3, 50, 16);

    // A deeper single-threaded search plays the role of ground truth.
    let groundtruth = flat::query(dataset.as_view(), queries.as_view(), 20, 1).unwrap();
    let pool = create_thread_pool_for_test();
    for strategy in [Strategy::QueryParallel, Strategy::DatasetParallel] {
        let params = FlatParams::new(10).unwrap().with_strategy(strategy);
        let result = flat::search(dataset.as_view(), queries.as_view(), &params, &pool).unwrap();

        assert!(recall::validate_top_k(&result, &groundtruth).unwrap());
        assert_eq!(recall::accuracy(&result, &groundtruth).unwrap(), 1.0);

        let metrics = recall::knn(
            &groundtruth,
            None,
            &result,
            10,
            10,
            false,
        )
        .unwrap();
        assert_eq!(metrics.average, 1.0);
        assert_eq!(metrics.minimum, 10);
    }

    assert!(recall::validate_top_k(&groundtruth, &groundtruth).unwrap());
}

#[test]
fn ground_truth_in_u32_validates_u64_results() {
    let dataset = random_dataset(4, 100, 8);
    let queries = random_dataset(5, 10, 8);
    let result = flat::query(dataset.as_view(), queries.as_view(), 5, 2).unwrap();

    let ids: Vec<u32> = result.ids().as_slice().iter().map(|&i| i as u32).collect();
    let mut groundtruth = Matrix::try_from(ids.into_boxed_slice(), 10, 5).unwrap();
    assert!(recall::validate_top_k(&result, &groundtruth).unwrap());

    // Swap the nearest neighbor of the first query for an id that is not a neighbor.
    let outsider = (0..100u32)
        .find(|id| !groundtruth.row(0).contains(id))
        .unwrap();
    groundtruth[(0, 0)] = outsider;
    assert!(!recall::validate_top_k(&result, &groundtruth).unwrap());
    assert_eq!(recall::accuracy(&result, &groundtruth).unwrap(), 49.0 / 50.0);
}

#[test]
fn identity_with_swapped_columns() {
    let mut centroids = Matrix::<f32>::zeros(3, 3, Layout::RowMajor);
    let mut vectors = Matrix::<f32>::zeros(3, 3, Layout::RowMajor);
    for i in 0..3 {
        centroids[(i, i)] = 1.0f32;
    }
    vectors[(0, 1)] = 1.0f32;
    vectors[(1, 0)] = 1.0;
    vectors[(2, 2)] = 1.0;

    let assignment = ivf::assign(centroids.as_view(), vectors.as_view(), 1, 2).unwrap();
    assert_eq!(assignment.nearest(), vec![1, 0, 2]);
}

#[test]
fn partitions_cover_every_vector_once() {
    let centroids = random_dataset(6, 8, 12);
    let vectors = random_dataset(7, 500, 12);

    let assignment = ivf::assign(centroids.as_view(), vectors.as_view(), 1, 4).unwrap();
    let nearest = assignment.nearest();
    let partitions = Partitions::build(vectors.as_view(), &nearest, centroids.nrows()).unwrap();

    let mut seen = vec![false; vectors.nrows()];
    for p in 0..partitions.num_partitions() {
        let (ids, members) = partitions.partition(p).unwrap();
        assert_eq!(ids.len(), members.nrows());
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "partition {p} is not stable");
        for (&id, row) in ids.iter().zip(members.row_iter()) {
            assert_eq!(nearest[id as usize], p as u64);
            assert_eq!(row, vectors.row(id as usize));
            assert!(!std::mem::replace(&mut seen[id as usize], true));
        }
    }
    assert!(seen.into_iter().all(|s| s));
}

#[test]
fn preconditions_fail_before_work() {
    let dataset = random_dataset(8, 10, 4);
    let queries = random_dataset(9, 3, 5);
    let err = flat::query(dataset.as_view(), queries.as_view(), 1, 4).unwrap_err();
    assert_eq!(err.kind(), VSErrorKind::DimensionMismatch);
    assert!(err.to_string().contains("dimension 4"), "{err}");

    let err = ivf::assign(dataset.as_view(), dataset.as_view(), 11, 2).unwrap_err();
    assert_eq!(err.kind(), VSErrorKind::InvalidArgument);
}
