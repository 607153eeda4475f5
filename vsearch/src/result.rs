/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use vsearch_utils::views::{Matrix, MatrixView, MutMatrixView};

use crate::neighbor::{NO_DISTANCE, NO_ID, Neighbor};

/// The `k` nearest neighbors of a batch of queries.
///
/// Holds two parallel row-major `nqueries x k` matrices. Row `i` lists the neighbors of
/// query `i` in ascending `(distance, id)` order; slots that could not be filled hold
/// [`NO_ID`] and [`NO_DISTANCE`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopKResult {
    ids: Matrix<u64>,
    distances: Matrix<f64>,
}

impl TopKResult {
    /// A result with every slot set to the sentinel.
    pub(crate) fn new(nqueries: usize, k: usize) -> Self {
        Self {
            ids: Matrix::new(NO_ID, nqueries, k),
            distances: Matrix::new(NO_DISTANCE, nqueries, k),
        }
    }

    pub fn nqueries(&self) -> usize {
        self.ids.nrows()
    }

    pub fn k(&self) -> usize {
        self.ids.ncols()
    }

    pub fn ids(&self) -> MatrixView<'_, u64> {
        self.ids.as_view()
    }

    pub fn distances(&self) -> MatrixView<'_, f64> {
        self.distances.as_view()
    }

    /// The ids and distances of the neighbors of query `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.nqueries()`.
    pub fn row(&self, i: usize) -> (&[u64], &[f64]) {
        (self.ids.row(i), self.distances.row(i))
    }

    /// Iterate the neighbors of query `i` in ascending order.
    pub fn neighbors(&self, i: usize) -> impl ExactSizeIterator<Item = Neighbor> + '_ {
        let (ids, distances) = self.row(i);
        ids.iter()
            .zip(distances)
            .map(|(&id, &distance)| Neighbor::new(id, distance))
    }

    /// Destructure into `(ids, distances)`.
    pub fn into_parts(self) -> (Matrix<u64>, Matrix<f64>) {
        (self.ids, self.distances)
    }

    pub(crate) fn parts_mut(&mut self) -> (MutMatrixView<'_, u64>, MutMatrixView<'_, f64>) {
        (self.ids.as_mut_view(), self.distances.as_mut_view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_as_sentinel() {
        let result = TopKResult::new(2, 3);
        assert_eq!(result.nqueries(), 2);
        assert_eq!(result.k(), 3);
        assert!(result.neighbors(1).all(|n| n == Neighbor::SENTINEL));

        let (ids, distances) = result.into_parts();
        assert_eq!(ids.shape(), (2, 3));
        assert_eq!(distances.shape(), (2, 3));
    }

    #[test]
    fn writes_through_parts() {
        let mut result = TopKResult::new(1, 2);
        {
            let (mut ids, mut distances) = result.parts_mut();
            ids.row_mut(0).copy_from_slice(&[4, 1]);
            distances.row_mut(0).copy_from_slice(&[0.5, 0.75]);
        }
        assert_eq!(result.row(0), (&[4u64, 1][..], &[0.5f64, 0.75][..]));
        assert_eq!(result.ids()[(0, 1)], 1);
    }
}
