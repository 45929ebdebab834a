//! Error taxonomy for GIF conversion jobs
//!
//! Every per-job failure is a [`GifError`]; its [`ErrorCategory`] decides
//! whether the batch treats it as a skip, a job failure or a playback error.

use crate::ffmpeg_process::FfmpegError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input path. Skip the file, warn, keep going.
    UserInput,
    /// The encoder (or another pipeline stage) failed.
    ExternalProcess,
    /// The preview player could not be run.
    Playback,
    /// Anything else: I/O trouble, panics.
    Other,
}

#[derive(Error, Debug)]
pub enum GifError {
    #[error("Does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Skipping gif: {}", .0.display())]
    AlreadyGif(PathBuf),

    #[error("Not a regular file: {}", .0.display())]
    NotRegularFile(PathBuf),

    #[error("Input has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Error playing: {0}")]
    Playback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl GifError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GifError::NotFound(_)
            | GifError::AlreadyGif(_)
            | GifError::NotRegularFile(_)
            | GifError::NoFileName(_) => ErrorCategory::UserInput,

            GifError::Ffmpeg(_) | GifError::ToolNotFound(_) => ErrorCategory::ExternalProcess,

            GifError::Playback(_) => ErrorCategory::Playback,

            GifError::Io(_) | GifError::Panicked(_) => ErrorCategory::Other,
        }
    }

    /// User-input problems are skips, not failures.
    pub fn is_skip(&self) -> bool {
        self.category() == ErrorCategory::UserInput
    }
}

pub type Result<T> = std::result::Result<T, GifError>;
