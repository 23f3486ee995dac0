//! Configuration for parallel batch builds.

use serde::{Deserialize, Serialize};

/// Configuration for parallel batch builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of threads to use (0 = use all available).
    pub max_threads: usize,

    /// Whether to log progress after each instrument.
    pub track_progress: bool,

    /// Whether to keep building after an instrument fails.
    pub continue_on_error: bool,

    /// Minimum parallelization threshold (batches below this run sequentially).
    pub min_parallel_jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            track_progress: true,
            continue_on_error: true,
            min_parallel_jobs: 4,
        }
    }
}
