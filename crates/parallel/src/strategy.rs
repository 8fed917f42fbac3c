//! Parallel processing strategies

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How independent work items are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

/// Strategy for mapping work over a slice of inputs
pub trait ParallelStrategy {
    /// Map `f` over `items`, keeping input order.
    fn map_ordered<I, T, F>(&self, items: &[I], f: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send;

    /// Fallible map; the first error in input order is returned.
    fn try_map_ordered<I, T, E, F>(&self, items: &[I], f: F) -> Result<Vec<T>, E>
    where
        I: Sync,
        T: Send,
        E: Send,
        F: Fn(&I) -> Result<T, E> + Sync + Send,
    {
        self.map_ordered(items, f).into_iter().collect()
    }
}

impl ParallelStrategy for ProcessingMode {
    fn map_ordered<I, T, F>(&self, items: &[I], f: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.iter().map(f).collect(),
            ProcessingMode::Parallel => items.par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(|| items.par_iter().map(f).collect()),
                    Err(e) => {
                        warn!("cannot build {}-thread pool ({}), using global pool", threads, e);
                        items.par_iter().map(f).collect()
                    }
                }
            }
        }
    }
}

/// Number of threads in the global rayon pool
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
