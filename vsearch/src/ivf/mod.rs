/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Coarse inverted-file partitioning.
//!
//! [`assign`] finds the nearest centroid(s) of every vector and [`Partitions::build`]
//! groups the vectors by their first-choice centroid.

use vsearch_utils::views::{Matrix, MatrixView};
use vsearch_vector::distance::Element;

use crate::{
    VSError, VSErrorKind, VSResult,
    flat::{self, FlatParams},
    utils::AsThreadPool,
};

/// The `k` nearest centroids of each of a batch of vectors.
///
/// Row `i` of [`ids`](Self::ids) and [`distances`](Self::distances) lists the centroids
/// closest to vector `i` in ascending `(distance, id)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    ids: Matrix<u64>,
    distances: Matrix<f64>,
}

impl Assignment {
    /// Number of assigned vectors.
    pub fn len(&self) -> usize {
        self.ids.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of centroids retained per vector.
    pub fn k(&self) -> usize {
        self.ids.ncols()
    }

    pub fn ids(&self) -> MatrixView<'_, u64> {
        self.ids.as_view()
    }

    pub fn distances(&self) -> MatrixView<'_, f64> {
        self.distances.as_view()
    }

    /// The first-choice centroid of every vector.
    pub fn nearest(&self) -> Vec<u64> {
        self.ids.row_iter().map(|row| row[0]).collect()
    }

    /// The distance from every vector to its first-choice centroid.
    pub fn nearest_distances(&self) -> Vec<f64> {
        self.distances.row_iter().map(|row| row[0]).collect()
    }

    /// Destructure into `(distances, ids)`.
    pub fn into_parts(self) -> (Matrix<f64>, Matrix<u64>) {
        (self.distances, self.ids)
    }
}

/// Assign each row of `vectors` to its `k` nearest rows of `centroids` under squared L2,
/// using `nthreads` threads.
///
/// Preconditions and error kinds are those of [`flat::query`] with `centroids` as the
/// dataset: mismatched dimensions give `DimensionMismatch`, while `k == 0`,
/// `k > centroids.nrows()` and `nthreads == 0` give `InvalidArgument`.
pub fn assign<T: Element>(
    centroids: MatrixView<'_, T>,
    vectors: MatrixView<'_, T>,
    k: usize,
    nthreads: usize,
) -> VSResult<Assignment> {
    tracing::debug!(
        ncentroids = centroids.nrows(),
        nvectors = vectors.nrows(),
        k,
        nthreads,
        "assigning vectors to centroids"
    );
    let params = FlatParams::new(k)?;
    let result = flat::search_with_threads(centroids, vectors, &params, nthreads)?;
    Ok(from_result(result))
}

/// Like [`assign`] but with explicit search parameters and a thread pool.
pub fn assign_with<T, P>(
    centroids: MatrixView<'_, T>,
    vectors: MatrixView<'_, T>,
    params: &FlatParams,
    pool: P,
) -> VSResult<Assignment>
where
    T: Element,
    P: AsThreadPool,
{
    flat::search(centroids, vectors, params, pool).map(from_result)
}

fn from_result(result: crate::result::TopKResult) -> Assignment {
    let (ids, distances) = result.into_parts();
    Assignment { ids, distances }
}

////////////////
// Partitions //
////////////////

/// Vectors grouped by their assigned centroid.
///
/// Partition `p` occupies rows `offsets[p]..offsets[p + 1]` of the grouped vectors. Within
/// a partition vectors keep their original relative order.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions<T> {
    offsets: Vec<usize>,
    ids: Vec<u64>,
    vectors: Matrix<T>,
}

impl<T: Element> Partitions<T> {
    /// Group the rows of `vectors` by `assignment`, which gives the centroid of every row
    /// (as returned by [`Assignment::nearest`]).
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `assignment.len() != vectors.nrows()`.
    /// * `InvalidArgument` if an entry of `assignment` is not below `num_centroids`.
    pub fn build(
        vectors: MatrixView<'_, T>,
        assignment: &[u64],
        num_centroids: usize,
    ) -> VSResult<Self> {
        if assignment.len() != vectors.nrows() {
            return Err(VSError::dimension_mismatch(format!(
                "an assignment of length {} cannot partition {} vectors",
                assignment.len(),
                vectors.nrows()
            )));
        }

        let mut offsets = vec![0usize; num_centroids + 1];
        for (i, &centroid) in assignment.iter().enumerate() {
            match usize::try_from(centroid) {
                Ok(c) if c < num_centroids => offsets[c + 1] += 1,
                _ => {
                    return Err(VSError::invalid_argument(format!(
                        "vector {i} is assigned to centroid {centroid} but there are only \
                         {num_centroids} centroids"
                    )));
                }
            }
        }
        for p in 0..num_centroids {
            offsets[p + 1] += offsets[p];
        }

        let mut cursor = offsets[..num_centroids].to_vec();
        let mut order = vec![0usize; assignment.len()];
        for (i, &centroid) in assignment.iter().enumerate() {
            // Bounds were checked above.
            let slot = &mut cursor[centroid as usize];
            order[*slot] = i;
            *slot += 1;
        }

        let source = vectors.as_row_major();
        let mut data = Vec::with_capacity(vectors.len());
        for &i in &order {
            data.extend_from_slice(source.row(i));
        }
        let grouped = Matrix::try_from(data.into_boxed_slice(), vectors.nrows(), vectors.ncols())
            .map_err(|err| err.as_static())?;

        let partitions = Self {
            offsets,
            ids: order.into_iter().map(|i| i as u64).collect(),
            vectors: grouped,
        };
        tracing::debug!(
            num_centroids,
            nvectors = partitions.ids.len(),
            largest = (0..num_centroids).map(|p| partitions.size(p)).max().unwrap_or(0),
            "built partitions"
        );
        Ok(partitions)
    }
}

impl<T> Partitions<T> {
    pub fn num_partitions(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The exclusive prefix sum of the partition sizes (length `num_partitions() + 1`).
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Original ids of all vectors, in partition order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// All vectors, in partition order.
    pub fn vectors(&self) -> MatrixView<'_, T> {
        self.vectors.as_view()
    }

    /// Number of vectors in partition `p`. Panics if `p` is out of bounds.
    pub fn size(&self, p: usize) -> usize {
        self.offsets[p + 1] - self.offsets[p]
    }

    /// The original ids and the vectors of partition `p`.
    ///
    /// Returns an `OutOfRange` error if `p >= self.num_partitions()`.
    pub fn partition(&self, p: usize) -> VSResult<(&[u64], MatrixView<'_, T>)> {
        if p >= self.num_partitions() {
            return Err(VSError::message(
                VSErrorKind::OutOfRange,
                format!(
                    "partition {p} is out of range for {} partitions",
                    self.num_partitions()
                ),
            ));
        }
        let range = self.offsets[p]..self.offsets[p + 1];
        let ncols = self.vectors.ncols();
        let data = &self.vectors.as_slice()[range.start * ncols..range.end * ncols];
        let vectors = MatrixView::try_from(data, range.len(), ncols).map_err(|e| e.as_static())?;
        Ok((&self.ids[range], vectors))
    }
}
