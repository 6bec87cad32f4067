//! Parallel dispatch used by the build and traversal algorithms.
//!
//! The algorithms are written against [`ExecutionSpace`] only; they never
//! spawn threads themselves. [`Serial`] runs everything on the calling thread
//! and gives deterministic schedules for tests, [`Rayon`] maps onto rayon's
//! work-stealing pool.

use crate::config;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;

const PARALLEL_TASKS_PER_THREAD: usize = 64;

pub trait ExecutionSpace: Sync {
    /// Calls `f(i)` once for every `i` in `range`, in no particular order.
    /// Returns only after every call has finished.
    fn parallel_for<F>(&self, range: Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send;

    /// Folds `f(i)` over `range` with an associative, commutative `combine`.
    fn parallel_reduce<T, F, C>(&self, range: Range<usize>, identity: T, f: F, combine: C) -> T
    where
        T: Clone + Send + Sync,
        F: Fn(usize) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send;

    /// Number of workers the space may run concurrently.
    fn concurrency(&self) -> usize;
}

/// Runs on the calling thread, in index order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Serial;

impl ExecutionSpace for Serial {
    fn parallel_for<F>(&self, range: Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        range.for_each(f);
    }

    fn parallel_reduce<T, F, C>(&self, range: Range<usize>, identity: T, f: F, combine: C) -> T
    where
        T: Clone + Send + Sync,
        F: Fn(usize) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send,
    {
        range.fold(identity, |acc, i| combine(acc, f(i)))
    }

    fn concurrency(&self) -> usize {
        1
    }
}

/// Rayon-backed space. Uses the global pool unless built with
/// [`Rayon::with_threads`].
#[derive(Clone, Debug, Default)]
pub struct Rayon {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Rayon {
    /// A space backed by its own pool of `n` worker threads.
    pub fn with_threads(n: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn min_len(&self, n: usize) -> usize {
        (n / (self.concurrency() * PARALLEL_TASKS_PER_THREAD)).max(1)
    }
}

impl ExecutionSpace for Rayon {
    fn parallel_for<F>(&self, range: Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        if range.len() < config::get_parallel_threshold() {
            return Serial.parallel_for(range, f);
        }
        let min_len = self.min_len(range.len());
        self.install(|| range.into_par_iter().with_min_len(min_len).for_each(f));
    }

    fn parallel_reduce<T, F, C>(&self, range: Range<usize>, identity: T, f: F, combine: C) -> T
    where
        T: Clone + Send + Sync,
        F: Fn(usize) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send,
    {
        if range.len() < config::get_parallel_threshold() {
            return Serial.parallel_reduce(range, identity, f, combine);
        }
        let min_len = self.min_len(range.len());
        self.install(|| {
            range
                .into_par_iter()
                .with_min_len(min_len)
                .map(f)
                .reduce(|| identity.clone(), &combine)
        })
    }

    fn concurrency(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}
