//! Shared Utilities for the vid-gif tools
//!
//! Tool-agnostic plumbing used by the `vid_gif` crate:
//! - Logging setup (tracing + optional rolling log file)
//! - Error taxonomy for per-file jobs
//! - Deadlock-free FFmpeg process wrapper
//! - Batch counters and progress bar
//! - Worker pool sizing
//! - External tools detection
//! - Shell escaping and file-size formatting

pub mod batch;
pub mod common_utils;
pub mod errors;
pub mod ffmpeg_process;
pub mod logging;
pub mod progress;
pub mod thread_manager;
pub mod tools;
pub mod types;

pub use batch::BatchResult;
pub use common_utils::{
    command_line, display_name, file_name_ends_with, safe_path_arg, shell_escape, shell_quote,
};
pub use errors::{ErrorCategory, GifError};
pub use ffmpeg_process::{format_ffmpeg_error, FfmpegError, FfmpegProcess};
pub use logging::{init_logging, LogConfig, Verbosity};
pub use progress::BatchProgressBar;
pub use thread_manager::{available_cpus, build_worker_pool};
pub use tools::ExternalTools;
pub use types::FileSize;
