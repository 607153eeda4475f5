/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::time::Instant;

use vsearch::{
    VSError,
    flat::{self, FlatParams},
};
use vsearch_providers::storage::{StorageReadProvider, StorageWriteProvider, save_groundtruth};
use vsearch_utils::{
    Scalar,
    io::GroundTruth,
    views::{Matrix, MatrixView},
};
use vsearch_vector::distance::Element;

use crate::utils::{CMDResult, CMDToolError, load_vectors};

/// Convert search output into the `u32` ids and `f32` distances of the ground truth file
/// format.
pub fn to_groundtruth(
    ids: MatrixView<'_, u64>,
    distances: MatrixView<'_, f64>,
) -> CMDResult<GroundTruth> {
    let (nrows, ncols) = ids.shape();
    let narrow_ids = ids
        .as_slice()
        .iter()
        .map(|&id| {
            u32::try_from(id).map_err(|_| {
                CMDToolError::new(format!(
                    "id {id} does not fit in the 32-bit ids of the ground truth format"
                ))
            })
        })
        .collect::<CMDResult<Box<[u32]>>>()?;
    let narrow_distances: Box<[f32]> = distances.as_slice().iter().map(|&d| d as f32).collect();

    Ok(GroundTruth {
        ids: Matrix::try_from(narrow_ids, nrows, ncols)
            .map_err(|e| VSError::from(e.as_static()))?,
        distances: Matrix::try_from(narrow_distances, distances.nrows(), distances.ncols())
            .map_err(|e| VSError::from(e.as_static()))?,
    })
}

/// Compute the exact nearest neighbors of every vector in `query_file` among the vectors
/// in `base_file` and save them to `ground_truth_file`.
pub fn compute_ground_truth_from_datafiles<T, P>(
    provider: &P,
    base_file: &str,
    query_file: &str,
    ground_truth_file: &str,
    params: &FlatParams,
    num_threads: usize,
) -> CMDResult<GroundTruth>
where
    T: Scalar + Element,
    P: StorageReadProvider + StorageWriteProvider,
{
    let base = load_vectors::<T, P>(provider, base_file)?;
    let queries = load_vectors::<T, P>(provider, query_file)?;

    let start = Instant::now();
    let result = flat::search_with_threads(base.as_view(), queries.as_view(), params, num_threads)?;
    tracing::info!(
        nqueries = queries.nrows(),
        k = params.k(),
        elapsed = ?start.elapsed(),
        "computed ground truth"
    );

    let groundtruth = to_groundtruth(result.ids(), result.distances())?;
    save_groundtruth(
        provider,
        ground_truth_file,
        groundtruth.ids.as_view(),
        groundtruth.distances.as_view(),
    )?;
    Ok(groundtruth)
}
