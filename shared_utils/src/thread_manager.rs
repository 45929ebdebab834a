//! Worker pool sizing
//!
//! One batch gets one fixed-size pool: as many workers as the host has
//! usable processing units. Each worker mostly sits in a blocking wait on
//! its FFmpeg child, FFmpeg does its own threading.

use anyhow::Result;
use std::sync::OnceLock;

/// Cached processor count for this process
static CPU_COUNT: OnceLock<usize> = OnceLock::new();

/// Usable processing units (respects affinity masks and cgroup quotas).
pub fn available_cpus() -> usize {
    *CPU_COUNT.get_or_init(|| num_cpus::get().max(1))
}

/// Build the batch worker pool, falling back to two threads if the
/// requested size cannot be created.
pub fn build_worker_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("gif-worker-{}", i))
        .build()
        .or_else(|_| rayon::ThreadPoolBuilder::new().num_threads(2).build())
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))
}
