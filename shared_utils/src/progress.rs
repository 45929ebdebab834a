//! Batch progress bar
//!
//! A single bar for multi-file batches. Workers only tick it; all messages
//! go through the logging layer once the batch is done.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub mod templates {
    pub const BATCH: &str =
        "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {pos}/{len} • ⏱️ {elapsed_precise} • {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

pub struct BatchProgressBar {
    bar: ProgressBar,
}

impl BatchProgressBar {
    /// Visible bar on stderr, or a hidden one (quiet mode, single file).
    ///
    /// indicatif stays silent by itself when stderr is not a terminal.
    pub fn new(total: u64, prefix: &str, visible: bool) -> Self {
        let bar = ProgressBar::new(total);
        if visible {
            if let Ok(style) = ProgressStyle::default_bar().template(templates::BATCH) {
                bar.set_style(
                    style
                        .progress_chars(templates::PROGRESS_CHARS)
                        .tick_chars(templates::SPINNER_CHARS),
                );
            }
            bar.set_prefix(prefix.to_string());
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    /// One job finished; `name` is shown as the latest file.
    pub fn inc(&self, name: &str) {
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BatchProgressBar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
