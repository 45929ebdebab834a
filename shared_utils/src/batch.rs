//! Batch Processing Module
//!
//! Counters for one batch invocation. Filled by the single aggregation step
//! after all workers joined, never shared between threads.

use crate::common_utils::display_name;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Inputs whose job failed, in report order
    pub failures: Vec<PathBuf>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self, path: PathBuf) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(path);
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    /// Inputs that did not produce an output, whatever the reason.
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.skipped
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    /// One-line summary, e.g. `Converted 3 files (1 skips/failures)`.
    pub fn summary_line(&self) -> String {
        format!(
            "Converted {} files ({} skips/failures)",
            self.succeeded,
            self.unsuccessful()
        )
    }

    /// `Failed: a.mov, b.mkv`, or `None` when nothing failed.
    pub fn failures_line(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<String> = self.failures.iter().map(|p| display_name(p)).collect();
        Some(format!("Failed: {}", names.join(", ")))
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
