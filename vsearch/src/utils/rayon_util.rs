/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::ops::Deref;

use rayon::prelude::ParallelIterator;

use crate::{
    VSError, VSResult,
    error::{ErrorContext, ensure_positive},
};

/// Creates a new thread pool with exactly `num_threads` workers.
///
/// Returns an `InvalidArgument` error if `num_threads` is zero: callers always choose the
/// degree of parallelism explicitly.
pub fn create_thread_pool(num_threads: usize) -> VSResult<RayonThreadPool> {
    ensure_positive(
        num_threads,
        VSError::invalid_argument("the number of threads must be at least 1, found 0"),
    )?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("vsearch-worker-{i}"))
        .build()
        .with_context(|| format!("while creating a pool with {num_threads} threads"))?;
    Ok(RayonThreadPool(pool))
}

/// Creates a thread pool with a configurable number of threads for testing purposes.
/// The number of threads can be set using the environment variable `VSEARCH_TEST_POOL_THREADS`.
/// If the environment variable is not set or cannot be parsed, it defaults to 3 threads.
#[allow(clippy::unwrap_used)]
pub fn create_thread_pool_for_test() -> RayonThreadPool {
    let num_threads = std::env::var("VSEARCH_TEST_POOL_THREADS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(3);

    create_thread_pool(num_threads).unwrap()
}

#[derive(Debug)]
pub struct RayonThreadPool(rayon::ThreadPool);

impl RayonThreadPool {
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.0.install(op)
    }

    /// Number of workers in the pool.
    pub fn num_threads(&self) -> usize {
        self.0.current_num_threads()
    }
}

/// An owned pool that derefs to itself, so `usize` and `&RayonThreadPool` can share the
/// [`AsThreadPool`] interface.
#[derive(Debug)]
pub struct OwnedPool(RayonThreadPool);

impl Deref for OwnedPool {
    type Target = RayonThreadPool;
    fn deref(&self) -> &RayonThreadPool {
        &self.0
    }
}

mod sealed {
    pub trait Sealed {}
}

/// This allows either an integer to be provided or an explicit `&RayonThreadPool`.
/// If an integer is provided, we create a new thread-pool with the requested number of
/// threads.
pub trait AsThreadPool: sealed::Sealed + Send + Sync {
    type Returns: Deref<Target = RayonThreadPool>;
    fn as_threadpool(&self) -> VSResult<Self::Returns>;
}

impl sealed::Sealed for usize {}
impl sealed::Sealed for &RayonThreadPool {}

impl AsThreadPool for usize {
    type Returns = OwnedPool;
    fn as_threadpool(&self) -> VSResult<Self::Returns> {
        create_thread_pool(*self).map(OwnedPool)
    }
}

impl<'a> AsThreadPool for &'a RayonThreadPool {
    type Returns = &'a RayonThreadPool;
    fn as_threadpool(&self) -> VSResult<Self::Returns> {
        Ok(self)
    }
}

/// The `forward_threadpool` macro simplifies obtaining a thread pool from an input
/// that implements the `AsThreadPool` trait.
#[macro_export]
macro_rules! forward_threadpool {
    ($out:ident = $in:ident) => {
        $crate::forward_threadpool!($out = $in: _);
    };
    ($out:ident = $in:ident: $type:ty) => {
        let $out = &*<$type as $crate::utils::AsThreadPool>::as_threadpool(&$in)?;
    };
}

/// Parallel operations that always run inside an explicit pool rather than the global
/// rayon pool.
#[allow(clippy::disallowed_methods)]
pub trait ParallelIteratorInPool: ParallelIterator + Sized {
    fn for_each_in_pool<OP>(self, pool: &RayonThreadPool, op: OP)
    where
        OP: Fn(Self::Item) + Sync + Send,
    {
        pool.install(|| self.for_each(op));
    }

    fn collect_in_pool<C>(self, pool: &RayonThreadPool) -> C
    where
        C: rayon::iter::FromParallelIterator<Self::Item> + Send,
    {
        pool.install(|| self.collect())
    }
}

impl<T> ParallelIteratorInPool for T where T: ParallelIterator {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rayon::prelude::IntoParallelIterator;

    use super::*;
    use crate::VSErrorKind;

    #[test]
    fn test_pool_size_from_env() {
        // SAFETY: The variable is only touched by this test.
        unsafe { std::env::set_var("VSEARCH_TEST_POOL_THREADS", "5") };
        let pool = create_thread_pool_for_test();
        assert_eq!(pool.num_threads(), 5);

        // SAFETY: See above.
        unsafe { std::env::set_var("VSEARCH_TEST_POOL_THREADS", "invalid") };
        let pool = create_thread_pool_for_test();
        assert_eq!(pool.num_threads(), 3);

        // SAFETY: See above.
        unsafe { std::env::remove_var("VSEARCH_TEST_POOL_THREADS") };
    }

    #[test]
    fn zero_threads_is_invalid() {
        let err = create_thread_pool(0).unwrap_err();
        assert_eq!(err.kind(), VSErrorKind::InvalidArgument);
        assert!(matches!(0usize.as_threadpool(), Err(e) if e.kind() == VSErrorKind::InvalidArgument));
    }

    fn assert_run_in_rayon_thread() {
        assert!(rayon::current_thread_index().is_some());
    }

    #[test]
    fn for_each_runs_on_pool_workers() {
        let pool = create_thread_pool(4).unwrap();

        let res = Mutex::new(Vec::new());
        (0..5).into_par_iter().for_each_in_pool(&pool, |x| {
            res.lock().unwrap().push(x);
            assert_run_in_rayon_thread();
        });

        let mut res = res.into_inner().unwrap();
        res.sort();
        assert_eq!(&res[..], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn collect_keeps_order() {
        let pool = create_thread_pool(2).unwrap();
        let vec = (0..100)
            .into_par_iter()
            .map(|i| i * 2)
            .collect_in_pool::<Vec<_>>(&pool);
        assert_eq!(vec, (0..100).map(|i| i * 2).collect::<Vec<_>>());
    }

    fn sum_in<P: AsThreadPool>(pool: P) -> VSResult<usize> {
        forward_threadpool!(pool = pool);
        Ok((0..100usize)
            .into_par_iter()
            .collect_in_pool::<Vec<_>>(pool)
            .into_iter()
            .sum())
    }

    #[test]
    fn as_threadpool_accepts_counts_and_pools() {
        assert_eq!(sum_in(2usize).unwrap(), 4950);
        let pool = create_thread_pool(2).unwrap();
        assert_eq!(sum_in(&pool).unwrap(), 4950);
    }
}
