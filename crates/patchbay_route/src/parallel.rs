//! Speculative search over several start candidates at once.
//!
//! Each candidate is searched on its own private snapshot inside a fixed
//! rayon pool. The only shared state is the result map, which is keyed by
//! candidate index so the reduction is independent of completion order.

use patchbay_common::{InternalError, PatchbayResult};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Pool size used when the configuration does not set one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get) + 1
}

/// The fixed thread pool candidate searches run on.
pub struct SearchPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl SearchPool {
    /// Builds a pool with `threads` workers, or [`default_threads`].
    pub fn new(threads: Option<usize>) -> Result<Self, rayon::ThreadPoolBuildError> {
        let threads = threads.unwrap_or_else(default_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("patchbay-search-{i}"))
            .build()?;
        Ok(Self { pool, threads })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `search` for every candidate and collects the costs of the ones
    /// that found a path, keyed by candidate index.
    ///
    /// The first internal error aborts the round.
    pub fn run_candidates<T, F>(
        &self,
        candidates: &[T],
        search: F,
    ) -> PatchbayResult<BTreeMap<usize, u32>>
    where
        T: Sync,
        F: Fn(&T) -> PatchbayResult<Option<u32>> + Sync,
    {
        let results = Mutex::new(BTreeMap::new());
        self.pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .try_for_each(|(index, candidate)| {
                    if let Some(cost) = search(candidate)? {
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(index, cost);
                    }
                    Ok::<(), InternalError>(())
                })
        })?;
        Ok(results.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for SearchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPool")
            .field("threads", &self.threads)
            .finish()
    }
}

/// The cheapest result; equal costs go to the lowest candidate index.
pub fn select_best(results: &BTreeMap<usize, u32>) -> Option<(usize, u32)> {
    results
        .iter()
        .min_by_key(|&(&index, &cost)| (cost, index))
        .map(|(&index, &cost)| (index, cost))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_cost_wins() {
        let pool = SearchPool::new(Some(4)).unwrap();
        let costs = [5, 3, 8, 3];
        let results = pool.run_candidates(&costs, |&cost| Ok(Some(cost))).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(select_best(&results), Some((1, 3)));
    }

    #[test]
    fn failed_candidates_are_skipped() {
        let pool = SearchPool::new(Some(2)).unwrap();
        let costs = [None, Some(7), None];
        let results = pool.run_candidates(&costs, |&cost| Ok(cost)).unwrap();
        assert_eq!(select_best(&results), Some((1, 7)));

        let none = pool.run_candidates(&[None::<u32>; 3], |&c| Ok(c)).unwrap();
        assert_eq!(select_best(&none), None);
    }

    #[test]
    fn internal_errors_abort_the_round() {
        let pool = SearchPool::new(Some(2)).unwrap();
        let err = pool
            .run_candidates(&[1u32, 2], |&c| {
                if c == 2 {
                    Err(InternalError::new("corrupt snapshot"))
                } else {
                    Ok(Some(c))
                }
            })
            .unwrap_err();
        assert_eq!(err.message, "corrupt snapshot");
    }

    #[test]
    fn default_pool_has_spare_thread() {
        assert!(default_threads() >= 2);
        let pool = SearchPool::new(None).unwrap();
        assert_eq!(pool.threads(), default_threads());
    }
}
