/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use vsearch::{
    flat::FlatParams,
    ivf::{self, Partitions},
};
use vsearch_providers::storage::{StorageReadProvider, StorageWriteProvider, save_groundtruth};
use vsearch_utils::Scalar;
use vsearch_vector::distance::Element;

use crate::utils::{CMDResult, load_vectors, to_groundtruth};

/// Partition sizes produced by [`assign_from_datafiles`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSummary {
    /// Number of vectors whose nearest centroid is each centroid.
    pub partition_sizes: Vec<usize>,
}

impl AssignmentSummary {
    pub fn num_empty(&self) -> usize {
        self.partition_sizes.iter().filter(|&&s| s == 0).count()
    }

    pub fn largest(&self) -> usize {
        self.partition_sizes.iter().copied().max().unwrap_or(0)
    }
}

/// Assign every vector in `vectors_file` to its `params.k()` nearest centroids from
/// `centroids_file`, saving the assignment in the ground truth format when an output is
/// given.
pub fn assign_from_datafiles<T, P>(
    provider: &P,
    centroids_file: &str,
    vectors_file: &str,
    assignment_file: Option<&str>,
    params: &FlatParams,
    num_threads: usize,
) -> CMDResult<AssignmentSummary>
where
    T: Scalar + Element,
    P: StorageReadProvider + StorageWriteProvider,
{
    let centroids = load_vectors::<T, P>(provider, centroids_file)?;
    let vectors = load_vectors::<T, P>(provider, vectors_file)?;

    let assignment = ivf::assign_with(centroids.as_view(), vectors.as_view(), params, num_threads)?;
    let partitions = Partitions::build(vectors.as_view(), &assignment.nearest(), centroids.nrows())?;
    let summary = AssignmentSummary {
        partition_sizes: (0..partitions.num_partitions())
            .map(|p| partitions.size(p))
            .collect(),
    };
    tracing::info!(
        ncentroids = centroids.nrows(),
        nvectors = vectors.nrows(),
        empty = summary.num_empty(),
        largest = summary.largest(),
        "assigned vectors to centroids"
    );

    if let Some(path) = assignment_file {
        let output = to_groundtruth(assignment.ids(), assignment.distances())?;
        save_groundtruth(provider, path, output.ids.as_view(), output.distances.as_view())?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use vsearch_providers::storage::{VirtualStorageProvider, load_groundtruth, save_bin};
    use vsearch_utils::views::Matrix;

    use super::*;

    #[test]
    fn swapped_identity_lands_in_swapped_partitions() {
        let provider = VirtualStorageProvider::new_memory();
        let centroids =
            Matrix::try_from(vec![1i8, 0, 0, 0, 1, 0, 0, 0, 1].into_boxed_slice(), 3, 3).unwrap();
        let vectors = Matrix::try_from(
            vec![0i8, 1, 0, 1, 0, 0, 0, 0, 1, 0, 2, 0].into_boxed_slice(),
            4,
            3,
        )
        .unwrap();
        save_bin(&provider, "/centroids.bin", centroids.as_view()).unwrap();
        save_bin(&provider, "/vectors.bin", vectors.as_view()).unwrap();

        let summary = assign_from_datafiles::<i8, _>(
            &provider,
            "/centroids.bin",
            "/vectors.bin",
            Some("/assignment.bin"),
            &FlatParams::new(2).unwrap(),
            2,
        )
        .unwrap();
        assert_eq!(summary.partition_sizes, vec![1, 2, 1]);
        assert_eq!(summary.num_empty(), 0);
        assert_eq!(summary.largest(), 2);

        let saved = load_groundtruth(&provider, "/assignment.bin").unwrap();
        assert_eq!(saved.k(), 2);
        assert_eq!(saved.ids.row(0)[0], 1);
        assert_eq!(saved.ids.row(1)[0], 0);
        assert_eq!(saved.ids.row(2)[0], 2);
        assert_eq!(saved.ids.row(3)[0], 1);
        assert_eq!(saved.distances.row(3)[0], 1.0);
    }

    #[test]
    fn too_many_probes_fail() {
        let provider = VirtualStorageProvider::new_memory();
        let centroids = Matrix::try_from(vec![0.0f32, 1.0].into_boxed_slice(), 2, 1).unwrap();
        save_bin(&provider, "/c.bin", centroids.as_view()).unwrap();
        let err = assign_from_datafiles::<f32, _>(
            &provider,
            "/c.bin",
            "/c.bin",
            None,
            &FlatParams::new(3).unwrap(),
            1,
        )
        .unwrap_err();
        assert!(err.details.starts_with("InvalidArgument"), "{err}");
    }
}
