//! External tool detection
//!
//! The encoder, the stream splitter and the player are plain programs found
//! on `PATH`. Each can be overridden through an environment variable.

use crate::errors::{GifError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const FFMPEG_ENV: &str = "VID_GIF_FFMPEG";
pub const TEE_ENV: &str = "VID_GIF_TEE";
pub const PLAYER_ENV: &str = "VID_GIF_PLAYER";

/// Programs the conversion pipeline shells out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTools {
    pub ffmpeg: PathBuf,
    /// GNU tee, needed for streamed playback
    pub tee: PathBuf,
    /// mpv-compatible player
    pub player: PathBuf,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            tee: PathBuf::from("tee"),
            player: PathBuf::from("mpv"),
        }
    }
}

impl ExternalTools {
    /// Defaults, overridden by `VID_GIF_FFMPEG`, `VID_GIF_TEE`, `VID_GIF_PLAYER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let pick = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };
        let defaults = Self::default();
        Self {
            ffmpeg: pick(FFMPEG_ENV, defaults.ffmpeg),
            tee: pick(TEE_ENV, defaults.tee),
            player: pick(PLAYER_ENV, defaults.player),
        }
    }

    /// Resolve the encoder to an executable path.
    pub fn require_ffmpeg(&self) -> Result<PathBuf> {
        resolve(&self.ffmpeg)
    }

    /// Streamed playback relies on GNU tee's `--output-error`, so Linux only.
    pub fn supports_streaming(&self) -> bool {
        cfg!(target_os = "linux") && is_available(&self.tee)
    }
}

/// Find `tool` on `PATH` (or check it directly if it is a path).
pub fn resolve(tool: &Path) -> Result<PathBuf> {
    which::which(tool).map_err(|_| GifError::ToolNotFound(tool.display().to_string()))
}

pub fn is_available(tool: &Path) -> bool {
    resolve(tool).is_ok()
}
