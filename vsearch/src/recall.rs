/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Comparison of search results against ground truth.

use std::{borrow::Cow, collections::HashSet, fmt::Debug, hash::Hash};

use thiserror::Error;
use vsearch_utils::views::{DenseData, Layout, MatrixBase};

use crate::{VSError, VSErrorKind, VSResult, result::TopKResult};

/// Summary of a `recall_k`-at-`recall_n` evaluation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct RecallMetrics {
    pub recall_k: usize,
    pub recall_n: usize,
    pub num_queries: usize,
    /// Matched ids over `recall_k * num_queries`.
    pub average: f64,
    /// Fewest matched ids in a single query, at most `recall_k`.
    pub minimum: usize,
    /// Most matched ids in a single query, at most `recall_k`.
    pub maximum: usize,
}

#[derive(Debug, Error)]
pub enum ComputeRecallError {
    #[error("{what} has {found} rows but the ground truth has {expected}")]
    RowCount {
        what: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("recall_k ({0}) exceeds recall_n ({1})")]
    KExceedsN(usize, usize),
    #[error("a result row holds {0} ids, fewer than recall_n ({1})")]
    TooFewResults(usize, usize),
    #[error("a ground truth row holds {0} ids, fewer than the {1} required")]
    TooFewGroundTruth(usize, usize),
    #[error("ground truth distances have {0} columns but the ids have {1}")]
    DistanceWidth(usize, usize),
    #[error("accuracy is undefined for an empty result set")]
    EmptyResults,
}

impl From<ComputeRecallError> for VSError {
    #[track_caller]
    fn from(err: ComputeRecallError) -> Self {
        let kind = match err {
            ComputeRecallError::RowCount { .. } | ComputeRecallError::DistanceWidth(..) => {
                VSErrorKind::DimensionMismatch
            }
            ComputeRecallError::KExceedsN(..)
            | ComputeRecallError::TooFewResults(..)
            | ComputeRecallError::TooFewGroundTruth(..)
            | ComputeRecallError::EmptyResults => VSErrorKind::InvalidArgument,
        };
        Self::new(kind, err)
    }
}

/// Row access shared by result and ground truth containers.
///
/// `row(i)` must succeed for every `i < nrows()`. Rows are borrowed when the container
/// stores them contiguously and gathered into an owned buffer otherwise, so column-major
/// matrices are accepted as they are. `ncols` is `Some` only when every row has the same
/// length.
pub trait Rows<T: Clone> {
    fn nrows(&self) -> usize;

    fn row(&self, i: usize) -> Cow<'_, [T]>;

    fn ncols(&self) -> Option<usize> {
        None
    }
}

impl<D> Rows<D::Elem> for MatrixBase<D>
where
    D: DenseData,
    D::Elem: Clone,
{
    fn nrows(&self) -> usize {
        MatrixBase::nrows(self)
    }

    fn row(&self, i: usize) -> Cow<'_, [D::Elem]> {
        match self.layout() {
            Layout::RowMajor => Cow::Borrowed(MatrixBase::row(self, i)),
            Layout::ColumnMajor => Cow::Owned(self.row_view(i).to_vec()),
        }
    }

    fn ncols(&self) -> Option<usize> {
        Some(MatrixBase::ncols(self))
    }
}

impl<T: Clone> Rows<T> for Vec<Vec<T>> {
    fn nrows(&self) -> usize {
        self.len()
    }

    fn row(&self, i: usize) -> Cow<'_, [T]> {
        Cow::Borrowed(&self[i])
    }
}

impl Rows<u64> for TopKResult {
    fn nrows(&self) -> usize {
        self.nqueries()
    }

    fn row(&self, i: usize) -> Cow<'_, [u64]> {
        Cow::Borrowed(TopKResult::row(self, i).0)
    }

    fn ncols(&self) -> Option<usize> {
        Some(self.k())
    }
}

/// Ids that can be compared across integer widths: ground truth files store `u32` while
/// search results use `u64`.
pub trait RecallId: Copy + Eq + Hash + Debug {
    fn to_u64(self) -> u64;
}

macro_rules! recall_id {
    ($($T:ty),*) => {
        $(impl RecallId for $T {
            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }
        })*
    };
}

recall_id!(u32, u64, usize);

fn check_rows(
    what: &'static str,
    found: usize,
    expected: usize,
) -> Result<(), ComputeRecallError> {
    if found == expected {
        Ok(())
    } else {
        Err(ComputeRecallError::RowCount {
            what,
            found,
            expected,
        })
    }
}

/// Return `true` if, for every query, the set of ids in `results` equals the set of the
/// first `k` ids of the ground truth, where `k` is the length of the result row.
///
/// Order within a row is ignored. A single mismatching row fails the whole batch.
///
/// # Errors
///
/// * `DimensionMismatch` if the two inputs have a different number of rows.
/// * `InvalidArgument` if a ground truth row is shorter than its result row.
pub fn validate_top_k<R, G>(results: &dyn Rows<R>, groundtruth: &dyn Rows<G>) -> VSResult<bool>
where
    R: RecallId,
    G: RecallId,
{
    check_rows("results", results.nrows(), groundtruth.nrows())?;

    let mut expected = HashSet::new();
    let mut found = HashSet::new();
    let mut valid = true;
    for i in 0..results.nrows() {
        let result = results.row(i);
        let gt = groundtruth.row(i);
        let k = result.len();
        if gt.len() < k {
            return Err(ComputeRecallError::TooFewGroundTruth(gt.len(), k).into());
        }

        expected.clear();
        expected.extend(gt[..k].iter().map(|id| id.to_u64()));
        found.clear();
        found.extend(result.iter().map(|id| id.to_u64()));
        if found != expected {
            tracing::debug!(query = i, "result set differs from ground truth");
            valid = false;
        }
    }
    Ok(valid)
}

/// The fraction of returned ids that appear anywhere in the corresponding ground truth
/// row: `sum(|results_i ∩ groundtruth_i|) / sum(|results_i|)`, counting unique ids.
///
/// # Errors
///
/// * `DimensionMismatch` if the two inputs have a different number of rows.
/// * `InvalidArgument` if `results` contains no ids at all.
pub fn accuracy<R, G>(results: &dyn Rows<R>, groundtruth: &dyn Rows<G>) -> VSResult<f64>
where
    R: RecallId,
    G: RecallId,
{
    check_rows("results", results.nrows(), groundtruth.nrows())?;

    let mut gt_ids = HashSet::new();
    let mut result_ids = HashSet::new();
    let (mut matched, mut total) = (0usize, 0usize);
    for i in 0..results.nrows() {
        gt_ids.clear();
        gt_ids.extend(groundtruth.row(i).iter().map(|id| id.to_u64()));
        result_ids.clear();
        result_ids.extend(results.row(i).iter().map(|id| id.to_u64()));

        matched += result_ids.intersection(&gt_ids).count();
        total += result_ids.len();
    }

    if total == 0 {
        return Err(ComputeRecallError::EmptyResults.into());
    }
    Ok(matched as f64 / total as f64)
}

/// `recall_k`-at-`recall_n`: per query, how many of the first `recall_k` ground truth ids
/// occur among the first `recall_n` results.
///
/// With `groundtruth_distances`, ground truth ids past position `recall_k` whose distance
/// equals that of the `recall_k`-th entry also count as matches. A query never scores
/// more than `recall_k`.
///
/// Result rows shorter than `recall_n` are an error unless `allow_insufficient_results`.
pub fn knn<G, R>(
    groundtruth: &dyn Rows<G>,
    groundtruth_distances: Option<&dyn Rows<f32>>,
    results: &dyn Rows<R>,
    recall_k: usize,
    recall_n: usize,
    allow_insufficient_results: bool,
) -> Result<RecallMetrics, ComputeRecallError>
where
    G: RecallId,
    R: RecallId,
{
    if recall_k > recall_n {
        return Err(ComputeRecallError::KExceedsN(recall_k, recall_n));
    }

    let nrows = groundtruth.nrows();
    check_rows("results", results.nrows(), nrows)?;
    if let Some(distances) = groundtruth_distances {
        check_rows("ground truth distances", distances.nrows(), nrows)?;
        if let (Some(width), Some(ids)) = (distances.ncols(), groundtruth.ncols())
            && width != ids
        {
            return Err(ComputeRecallError::DistanceWidth(width, ids));
        }
    }

    let mut gt_set = HashSet::new();
    let mut result_set = HashSet::new();
    let mut counts = Vec::with_capacity(nrows);
    for i in 0..nrows {
        let result = results.row(i);
        if result.len() < recall_n && !allow_insufficient_results {
            return Err(ComputeRecallError::TooFewResults(result.len(), recall_n));
        }
        let gt = groundtruth.row(i);
        if gt.len() < recall_k {
            return Err(ComputeRecallError::TooFewGroundTruth(gt.len(), recall_k));
        }

        gt_set.clear();
        gt_set.extend(gt[..recall_k].iter().map(|id| id.to_u64()));
        if let Some(distances) = groundtruth_distances
            && recall_k > 0
        {
            let row = distances.row(i);
            if let Some(&boundary) = row.get(recall_k - 1) {
                let tied = row[recall_k..]
                    .iter()
                    .zip(&gt[recall_k..])
                    .take_while(|(d, _)| **d == boundary);
                gt_set.extend(tied.map(|(_, id)| id.to_u64()));
            }
        }

        result_set.clear();
        result_set.extend(result.iter().take(recall_n).map(|id| id.to_u64()));
        counts.push(gt_set.intersection(&result_set).count().min(recall_k));
    }

    let matched: usize = counts.iter().sum();
    let average = match recall_k * nrows {
        0 => 0.0,
        possible => matched as f64 / possible as f64,
    };
    Ok(RecallMetrics {
        recall_k,
        recall_n,
        num_queries: nrows,
        average,
        minimum: counts.iter().copied().min().unwrap_or(0),
        maximum: counts.iter().copied().max().unwrap_or(0),
    })
}

///////////
// Tests //
///////////
