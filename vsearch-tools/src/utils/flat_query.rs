/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::time::{Duration, Instant};

use vsearch::{
    TopKResult,
    flat::{self, FlatParams},
    recall::{self, RecallMetrics},
};
use vsearch_providers::storage::{
    StorageReadProvider, StorageWriteProvider, load_groundtruth, save_groundtruth,
};
use vsearch_utils::Scalar;
use vsearch_vector::distance::Element;

use crate::utils::{CMDResult, load_vectors, to_groundtruth};

/// Inputs and optional outputs of a flat query run.
#[derive(Debug, Clone, Copy)]
pub struct FlatQueryFiles<'a> {
    pub base_file: &'a str,
    pub query_file: &'a str,
    /// Ground truth to score the results against.
    pub ground_truth_file: Option<&'a str>,
    /// Where to save the results, in the ground truth format.
    pub result_file: Option<&'a str>,
}

#[derive(Debug)]
pub struct FlatQueryReport {
    pub result: TopKResult,
    pub elapsed: Duration,
    pub recall: Option<RecallMetrics>,
    /// Whether every result row holds exactly the first `k` ground truth ids.
    pub valid: Option<bool>,
}

/// Search the base vectors for the nearest neighbors of every query, optionally scoring
/// and saving the results.
pub fn flat_query_from_datafiles<T, P>(
    provider: &P,
    files: FlatQueryFiles<'_>,
    params: &FlatParams,
    num_threads: usize,
) -> CMDResult<FlatQueryReport>
where
    T: Scalar + Element,
    P: StorageReadProvider + StorageWriteProvider,
{
    let base = load_vectors::<T, P>(provider, files.base_file)?;
    let queries = load_vectors::<T, P>(provider, files.query_file)?;

    let start = Instant::now();
    let result = flat::search_with_threads(base.as_view(), queries.as_view(), params, num_threads)?;
    let elapsed = start.elapsed();
    tracing::info!(
        nqueries = queries.nrows(),
        npoints = base.nrows(),
        k = params.k(),
        strategy = %params.strategy(),
        num_threads,
        ?elapsed,
        "flat query finished"
    );

    let (mut recall, mut valid) = (None, None);
    if let Some(path) = files.ground_truth_file {
        let groundtruth = load_groundtruth(provider, path)?;
        let recall_k = params.k().min(groundtruth.k());
        let metrics = recall::knn(
            &groundtruth.ids,
            Some(&groundtruth.distances),
            &result,
            recall_k,
            params.k(),
            false,
        )?;
        tracing::info!(
            recall_k,
            recall_n = params.k(),
            average = metrics.average,
            minimum = metrics.minimum,
            "recall"
        );
        recall = Some(metrics);
        if groundtruth.k() >= params.k() {
            valid = Some(recall::validate_top_k(&result, &groundtruth.ids)?);
        }
    }

    if let Some(path) = files.result_file {
        let output = to_groundtruth(result.ids(), result.distances())?;
        save_groundtruth(provider, path, output.ids.as_view(), output.distances.as_view())?;
    }

    Ok(FlatQueryReport {
        result,
        elapsed,
        recall,
        valid,
    })
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;
    use vsearch::flat::Strategy;
    use vsearch_providers::{
        array::save_matrix,
        storage::{VirtualStorageProvider, save_bin},
    };
    use vsearch_utils::views::{Init, Layout, Matrix};

    use super::*;
    use crate::utils::{compute_ground_truth_from_datafiles, init_test_subscriber};

    fn random(seed: u64, nrows: usize, ncols: usize, layout: Layout) -> Matrix<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        Matrix::with_layout(Init(|| rng.random_range(-1.0f32..1.0)), nrows, ncols, layout)
    }

    #[rstest]
    fn scores_against_ground_truth(
        #[values(Strategy::QueryParallel, Strategy::DatasetParallel)] strategy: Strategy,
    ) {
        let _guard = init_test_subscriber();
        let provider = VirtualStorageProvider::new_memory();
        save_bin(&provider, "/base.bin", random(10, 200, 8, Layout::RowMajor).as_view()).unwrap();
        save_matrix(&provider, "/queries", random(11, 20, 8, Layout::ColumnMajor).as_view())
            .unwrap();

        let deep = FlatParams::new(20).unwrap();
        compute_ground_truth_from_datafiles::<f32, _>(
            &provider,
            "/base.bin",
            "/queries",
            "/gt.bin",
            &deep,
            1,
        )
        .unwrap();

        let files = FlatQueryFiles {
            base_file: "/base.bin",
            query_file: "/queries",
            ground_truth_file: Some("/gt.bin"),
            result_file: Some("/result.bin"),
        };
        let params = FlatParams::new(10).unwrap().with_strategy(strategy);
        let report = flat_query_from_datafiles::<f32, _>(&provider, files, &params, 3).unwrap();

        assert_eq!(report.result.nqueries(), 20);
        assert_eq!(report.valid, Some(true));
        let recall = report.recall.unwrap();
        assert_eq!(recall.average, 1.0);
        assert_eq!(recall.num_queries, 20);

        let saved = load_groundtruth(&provider, "/result.bin").unwrap();
        assert_eq!(saved.k(), 10);
        assert_eq!(saved.ids.row(0)[0] as u64, report.result.row(0).0[0]);
    }

    #[test]
    fn shallow_ground_truth_is_scored_but_not_validated() {
        let provider = VirtualStorageProvider::new_memory();
        save_bin(&provider, "/base.bin", random(12, 50, 4, Layout::RowMajor).as_view()).unwrap();
        save_bin(&provider, "/query.bin", random(13, 5, 4, Layout::RowMajor).as_view()).unwrap();
        compute_ground_truth_from_datafiles::<f32, _>(
            &provider,
            "/base.bin",
            "/query.bin",
            "/gt.bin",
            &FlatParams::new(3).unwrap(),
            2,
        )
        .unwrap();

        let files = FlatQueryFiles {
            base_file: "/base.bin",
            query_file: "/query.bin",
            ground_truth_file: Some("/gt.bin"),
            result_file: None,
        };
        let report =
            flat_query_from_datafiles::<f32, _>(&provider, files, &FlatParams::new(5).unwrap(), 2)
                .unwrap();
        assert_eq!(report.valid, None);
        assert_eq!(report.recall.unwrap().recall_k, 3);
        assert!(!provider.exists("/result.bin"));
    }

    #[test]
    fn mismatched_dimensions_fail() {
        let provider = VirtualStorageProvider::new_memory();
        save_bin(&provider, "/base.bin", random(14, 10, 4, Layout::RowMajor).as_view()).unwrap();
        save_bin(&provider, "/query.bin", random(15, 2, 3, Layout::RowMajor).as_view()).unwrap();
        let files = FlatQueryFiles {
            base_file: "/base.bin",
            query_file: "/query.bin",
            ground_truth_file: None,
            result_file: None,
        };
        let err =
            flat_query_from_datafiles::<f32, _>(&provider, files, &FlatParams::new(1).unwrap(), 1)
                .unwrap_err();
        assert!(err.details.starts_with("DimensionMismatch"), "{err}");
    }
}
