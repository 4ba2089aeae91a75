//! Concurrent analysis of independent components.
//!
//! Strongly connected components share no state: each one gets its own
//! sub-graph, transition system and recurrence store. The
//! [`ComponentExecutor`] maps an analysis function over them, on the rayon
//! thread pool when the `parallel` feature is enabled and sequentially
//! otherwise. Results always come back in component order.
//!
//! # Feature Flag
//!
//! Parallel execution requires the `parallel` feature:
//! ```toml
//! [dependencies]
//! selftimed = { version = "0.1", features = ["parallel"] }
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
use tracing::warn;

use crate::graph::Graph;
use crate::scc::IdMap;

/// Runs per-component work, optionally in parallel.
#[derive(Clone, Debug, Default)]
pub struct ComponentExecutor {
    parallel: bool,
    /// Number of worker threads (0 = auto)
    num_threads: usize,
}

impl ComponentExecutor {
    /// Creates a sequential executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Pass 0 for automatic detection (uses number of CPUs).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// True if work will actually be spread over threads.
    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }

    /// Applies `f` to every component, returning results in input order.
    #[cfg(feature = "parallel")]
    pub fn map<T, F>(&self, parts: &[(Graph, IdMap)], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Graph, &IdMap) -> T + Sync + Send,
    {
        if !self.parallel || parts.len() < 2 {
            return parts.iter().map(|(g, ids)| f(g, ids)).collect();
        }

        let run = || -> Vec<T> { parts.par_iter().map(|(g, ids)| f(g, ids)).collect() };
        if self.num_threads == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build thread pool, using global pool");
                run()
            }
        }
    }

    /// Applies `f` to every component, returning results in input order.
    #[cfg(not(feature = "parallel"))]
    pub fn map<T, F>(&self, parts: &[(Graph, IdMap)], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Graph, &IdMap) -> T + Sync + Send,
    {
        if self.parallel {
            warn!("parallel analysis requested but the `parallel` feature is disabled");
        }
        parts.iter().map(|(g, ids)| f(g, ids)).collect()
    }
}
