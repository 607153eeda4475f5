/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Exact brute-force k-nearest-neighbor search.
//!
//! Every query is compared against every dataset vector. Two work decompositions are
//! available, both producing identical results for any thread count:
//!
//! * [`Strategy::QueryParallel`]: queries are split into contiguous batches and every
//!   worker scans the whole dataset for its batch, writing straight into its own rows of
//!   the output.
//! * [`Strategy::DatasetParallel`]: the dataset is split into one contiguous block per
//!   worker. Each worker keeps a bounded queue per query for its block and the queues are
//!   merged after all workers finish. This reads every dataset vector once, which is
//!   preferable when the query batch is small compared to the dataset.

use std::{fmt, ops::Range, str::FromStr};

use rayon::prelude::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use vsearch_utils::views::{MatrixView, MutMatrixView};
use vsearch_vector::distance::{Distance, Element, Metric};

use crate::{
    VSError, VSResult, forward_threadpool,
    error::ensure_positive,
    neighbor::TopKQueue,
    result::TopKResult,
    utils::{AsThreadPool, ParallelIteratorInPool, RayonThreadPool, create_thread_pool},
};

/// How the work of a flat search is divided between threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Split the queries between workers.
    #[default]
    QueryParallel,
    /// Split the dataset between workers and merge their partial results.
    DatasetParallel,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryParallel => "query",
            Self::DatasetParallel => "dataset",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = VSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "query" | "qv" => Ok(Self::QueryParallel),
            "dataset" | "vq" => Ok(Self::DatasetParallel),
            other => Err(VSError::invalid_argument(format!(
                "unknown search strategy \"{other}\", expected \"query\" or \"dataset\""
            ))),
        }
    }
}

/// Parameters of a flat search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatParams {
    k: usize,
    metric: Metric,
    strategy: Strategy,
}

impl FlatParams {
    /// Search for the `k` nearest neighbors using squared L2 and the default strategy.
    ///
    /// Returns an `InvalidArgument` error if `k` is zero.
    pub fn new(k: usize) -> VSResult<Self> {
        ensure_positive(
            k,
            VSError::invalid_argument("the number of neighbors k must be at least 1, found 0"),
        )?;
        Ok(Self {
            k,
            metric: Metric::L2,
            strategy: Strategy::default(),
        })
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

/// Find the `k` nearest `dataset` rows of every row of `queries` under squared L2, using
/// `nthreads` threads (`1` runs on the calling thread).
///
/// # Errors
///
/// * `DimensionMismatch` if the dataset and queries have different numbers of columns.
/// * `InvalidArgument` if `k == 0`, `k > dataset.nrows()` or `nthreads == 0`.
///
/// All checks happen before any work starts.
pub fn query<T: Element>(
    dataset: MatrixView<'_, T>,
    queries: MatrixView<'_, T>,
    k: usize,
    nthreads: usize,
) -> VSResult<TopKResult> {
    let params = FlatParams::new(k)?;
    search_with_threads(dataset, queries, &params, nthreads)
}

/// Like [`query`] but with explicit [`FlatParams`] and a thread count.
pub fn search_with_threads<T: Element>(
    dataset: MatrixView<'_, T>,
    queries: MatrixView<'_, T>,
    params: &FlatParams,
    nthreads: usize,
) -> VSResult<TopKResult> {
    check_inputs(dataset, queries, params)?;
    ensure_positive(
        nthreads,
        VSError::invalid_argument("the number of threads must be at least 1, found 0"),
    )?;
    if nthreads == 1 {
        execute(dataset, queries, params, None)
    } else {
        let pool = create_thread_pool(nthreads)?;
        execute(dataset, queries, params, Some(&pool))
    }
}

/// Run a flat search inside an existing pool (or one created from a thread count).
pub fn search<T, P>(
    dataset: MatrixView<'_, T>,
    queries: MatrixView<'_, T>,
    params: &FlatParams,
    pool: P,
) -> VSResult<TopKResult>
where
    T: Element,
    P: AsThreadPool,
{
    check_inputs(dataset, queries, params)?;
    forward_threadpool!(pool = pool);
    execute(dataset, queries, params, Some(pool))
}

fn check_inputs<T>(
    dataset: MatrixView<'_, T>,
    queries: MatrixView<'_, T>,
    params: &FlatParams,
) -> VSResult<()> {
    if dataset.ncols() != queries.ncols() {
        return Err(VSError::dimension_mismatch(format!(
            "dataset vectors have dimension {} but queries have dimension {}",
            dataset.ncols(),
            queries.ncols()
        )));
    }
    if params.k() > dataset.nrows() {
        return Err(VSError::invalid_argument(format!(
            "k = {} exceeds the number of dataset vectors ({})",
            params.k(),
            dataset.nrows()
        )));
    }
    Ok(())
}

/// Inputs are validated. `pool == None` runs on the calling thread.
fn execute<T: Element>(
    dataset: MatrixView<'_, T>,
    queries: MatrixView<'_, T>,
    params: &FlatParams,
    pool: Option<&RayonThreadPool>,
) -> VSResult<TopKResult> {
    let num_threads = pool.map_or(1, RayonThreadPool::num_threads);
    tracing::debug!(
        npoints = dataset.nrows(),
        nqueries = queries.nrows(),
        dim = dataset.ncols(),
        k = params.k(),
        metric = %params.metric(),
        strategy = %params.strategy(),
        num_threads,
        "flat search"
    );

    let dataset = dataset.as_row_major();
    let queries = queries.as_row_major();
    let distance = Distance::<T>::new(params.metric());
    let mut result = TopKResult::new(queries.nrows(), params.k());

    match params.strategy() {
        Strategy::QueryParallel => fill_rows(&mut result, pool, |q, queue| {
            let query = queries.row(q);
            for (id, x) in dataset.row_iter().enumerate() {
                queue.insert(id as u64, distance.call(x, query));
            }
        }),
        Strategy::DatasetParallel => {
            let blocks = split(dataset.nrows(), num_threads);
            let scan = |rows: Range<usize>| {
                tracing::trace!(start = rows.start, end = rows.end, "scanning dataset block");
                let mut queues = vec![TopKQueue::new(params.k()); queries.nrows()];
                for id in rows {
                    let x = dataset.row(id);
                    for (queue, query) in queues.iter_mut().zip(queries.row_iter()) {
                        queue.insert(id as u64, distance.call(x, query));
                    }
                }
                queues
            };
            let partials: Vec<Vec<TopKQueue>> = match pool {
                Some(pool) => blocks.into_par_iter().map(scan).collect_in_pool(pool),
                None => blocks.into_iter().map(scan).collect(),
            };
            fill_rows(&mut result, pool, |q, queue| {
                partials.iter().for_each(|partial| queue.merge(&partial[q]));
            });
        }
    }
    Ok(result)
}

/// Split `0..n` into at most `parts` contiguous non-empty ranges.
fn split(n: usize, parts: usize) -> Vec<Range<usize>> {
    let size = n.div_ceil(parts.max(1)).max(1);
    (0..n)
        .step_by(size)
        .map(|start| start..(start + size).min(n))
        .collect()
}

/// Populate every row of `result` by letting `fill` offer candidates for that query to
/// an empty queue. Workers own disjoint batches of rows.
fn fill_rows<F>(result: &mut TopKResult, pool: Option<&RayonThreadPool>, fill: F)
where
    F: Fn(usize, &mut TopKQueue) + Sync + Send,
{
    let (nqueries, k) = (result.nqueries(), result.k());
    let (mut ids, mut distances) = result.parts_mut();
    match pool {
        None => fill_window(0, ids, distances, &mut TopKQueue::new(k), &fill),
        Some(pool) => {
            let batch = nqueries.div_ceil(pool.num_threads()).max(1);
            ids.par_window_iter_mut(batch)
                .zip(distances.par_window_iter_mut(batch))
                .enumerate()
                .for_each_in_pool(pool, |(w, (ids, distances))| {
                    fill_window(w * batch, ids, distances, &mut TopKQueue::new(k), &fill)
                });
        }
    }
}

fn fill_window<F>(
    start: usize,
    mut ids: MutMatrixView<'_, u64>,
    mut distances: MutMatrixView<'_, f64>,
    queue: &mut TopKQueue,
    fill: &F,
) where
    F: Fn(usize, &mut TopKQueue),
{
    tracing::trace!(start, rows = ids.nrows(), "filling result rows");
    for r in 0..ids.nrows() {
        fill(start + r, queue);
        queue.write_to(ids.row_mut(r), distances.row_mut(r));
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;
    use vsearch_utils::views::{Init, Layout, Matrix};

    use super::*;
    use crate::{VSErrorKind, neighbor::NO_ID, utils::create_thread_pool_for_test};

    fn random_matrix(rng: &mut StdRng, nrows: usize, ncols: usize) -> Matrix<f32> {
        Matrix::new(Init(|| rng.random_range(-1.0f32..1.0)), nrows, ncols)
    }

    fn brute_force(dataset: &Matrix<f32>, query: &[f32], k: usize) -> Vec<(u64, f64)> {
        let mut all: Vec<(u64, f64)> = dataset
            .row_iter()
            .enumerate()
            .map(|(i, x)| {
                let d = x
                    .iter()
                    .zip(query)
                    .map(|(&a, &b)| (a as f64 - b as f64).powi(2))
                    .sum();
                (i as u64, d)
            })
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        all.truncate(k);
        all
    }

    #[rstest]
    fn matches_brute_force(
        #[values(Strategy::QueryParallel, Strategy::DatasetParallel)] strategy: Strategy,
        #[values(1, 4)] nthreads: usize,
        #[values(1, 7)] k: usize,
    ) {
        let mut rng = StdRng::seed_from_u64(42);
        let dataset = random_matrix(&mut rng, 97, 6);
        let queries = random_matrix(&mut rng, 13, 6);

        let params = FlatParams::new(k).unwrap().with_strategy(strategy);
        let result =
            search_with_threads(dataset.as_view(), queries.as_view(), &params, nthreads).unwrap();
        assert_eq!(result.nqueries(), 13);
        assert_eq!(result.k(), k);

        for (q, query) in queries.row_iter().enumerate() {
            let got: Vec<(u64, f64)> = result.neighbors(q).map(|n| n.as_tuple()).collect();
            let expected = brute_force(&dataset, query, k);
            assert_eq!(got.len(), expected.len());
            for ((gid, gd), (eid, ed)) in got.iter().zip(&expected) {
                assert_eq!(gid, eid, "query {q}");
                approx::assert_relative_eq!(*gd, *ed, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn thread_count_and_strategy_do_not_change_results() {
        let mut rng = StdRng::seed_from_u64(7);
        let dataset = random_matrix(&mut rng, 500, 16);
        let queries = random_matrix(&mut rng, 40, 16);

        let reference = query(dataset.as_view(), queries.as_view(), 10, 1).unwrap();
        for nthreads in [2, 3, 8] {
            for strategy in [Strategy::QueryParallel, Strategy::DatasetParallel] {
                let params = FlatParams::new(10).unwrap().with_strategy(strategy);
                let result =
                    search_with_threads(dataset.as_view(), queries.as_view(), &params, nthreads)
                        .unwrap();
                assert_eq!(result, reference, "nthreads = {nthreads}, {strategy}");
            }
        }

        let pool = create_thread_pool_for_test();
        let params = FlatParams::new(10).unwrap();
        let pooled = search(dataset.as_view(), queries.as_view(), &params, &pool).unwrap();
        assert_eq!(pooled, reference);
    }

    #[test]
    fn rows_are_sorted_and_unique() {
        let mut rng = StdRng::seed_from_u64(3);
        // Small integer coordinates produce lots of ties.
        let dataset = Matrix::new(Init(|| rng.random_range(0u8..3)), 200, 4);
        let queries = Matrix::new(Init(|| rng.random_range(0u8..3)), 25, 4);

        let result = query(dataset.as_view(), queries.as_view(), 20, 3).unwrap();
        for q in 0..result.nqueries() {
            let (ids, distances) = result.row(q);
            assert!(distances.windows(2).all(|w| w[0] <= w[1]), "query {q}");
            for w in ids.windows(2).zip(distances.windows(2)) {
                if w.1[0] == w.1[1] {
                    assert!(w.0[0] < w.0[1], "ties must list smaller ids first");
                }
            }
            let mut sorted = ids.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), ids.len());
            assert!(!ids.contains(&NO_ID));
        }
    }

    #[test]
    fn finds_itself() {
        let mut rng = StdRng::seed_from_u64(11);
        let dataset = random_matrix(&mut rng, 50, 8);
        let queries = Matrix::try_from(dataset.row(5).to_vec().into_boxed_slice(), 1, 8).unwrap();
        for nthreads in [1, 2] {
            let result = query(dataset.as_view(), queries.as_view(), 1, nthreads).unwrap();
            assert_eq!(result.row(0), (&[5u64][..], &[0.0f64][..]));
        }
    }

    #[test]
    fn column_major_inputs() {
        let mut rng = StdRng::seed_from_u64(5);
        let dataset = random_matrix(&mut rng, 30, 5);
        let queries = random_matrix(&mut rng, 4, 5);
        let expected = query(dataset.as_view(), queries.as_view(), 3, 1).unwrap();

        let dataset_cm = dataset.to_layout(Layout::ColumnMajor);
        let queries_cm = queries.to_layout(Layout::ColumnMajor);
        let result = query(dataset_cm.as_view(), queries_cm.as_view(), 3, 2).unwrap();
        assert_eq!(result, expected);
        assert_eq!(dataset_cm.layout(), Layout::ColumnMajor);
    }

    #[test]
    fn inner_product_prefers_aligned_vectors() {
        let dataset =
            Matrix::try_from(vec![1.0f32, 0.0, 0.0, 1.0, 2.0, 2.0].into_boxed_slice(), 3, 2)
                .unwrap();
        let queries = Matrix::try_from(vec![0.0f32, 1.0].into_boxed_slice(), 1, 2).unwrap();
        let params = FlatParams::new(2)
            .unwrap()
            .with_metric(Metric::InnerProduct);
        let result = search_with_threads(dataset.as_view(), queries.as_view(), &params, 1).unwrap();
        assert_eq!(result.row(0), (&[2u64, 1][..], &[-2.0f64, -1.0][..]));
    }

    #[test]
    fn empty_query_batch() {
        let dataset = Matrix::new(1.0f32, 3, 2);
        let queries = Matrix::new(0.0f32, 0, 2);
        let result = query(dataset.as_view(), queries.as_view(), 2, 4).unwrap();
        assert_eq!(result.nqueries(), 0);
        assert_eq!(result.k(), 2);
    }

    #[test]
    fn rejects_bad_arguments() {
        let dataset = Matrix::new(0.0f32, 4, 3);
        let queries = Matrix::new(0.0f32, 2, 3);
        let narrow = Matrix::new(0.0f32, 2, 2);

        let kind = |r: VSResult<TopKResult>| r.unwrap_err().kind();
        assert_eq!(
            kind(query(dataset.as_view(), narrow.as_view(), 1, 1)),
            VSErrorKind::DimensionMismatch
        );
        assert_eq!(
            kind(query(dataset.as_view(), queries.as_view(), 0, 1)),
            VSErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(query(dataset.as_view(), queries.as_view(), 5, 1)),
            VSErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(query(dataset.as_view(), queries.as_view(), 1, 0)),
            VSErrorKind::InvalidArgument
        );
        // k == rows is allowed.
        assert!(query(dataset.as_view(), queries.as_view(), 4, 1).is_ok());

        let message = query(dataset.as_view(), queries.as_view(), 5, 1)
            .unwrap_err()
            .to_string();
        assert!(message.contains("k = 5 exceeds the number of dataset vectors (4)"), "{message}");
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("query".parse::<Strategy>().unwrap(), Strategy::QueryParallel);
        assert_eq!("VQ".parse::<Strategy>().unwrap(), Strategy::DatasetParallel);
        assert_eq!(
            "bogus".parse::<Strategy>().unwrap_err().kind(),
            VSErrorKind::InvalidArgument
        );
    }

    #[test]
    fn split_covers_range() {
        assert_eq!(split(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(split(2, 8), vec![0..1, 1..2]);
        assert!(split(0, 4).is_empty());
    }
}
