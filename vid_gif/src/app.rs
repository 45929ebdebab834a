//! One `vid-gif` invocation after argument parsing
//!
//! Exit codes:
//! - 0: at least one GIF was produced
//! - 1: no GIF was produced, or FFmpeg is not installed
//! - 2: the GIFs were produced but playing them failed

use crate::config::{ConversionConfig, PlayMode};
use crate::history;
use crate::playback;
use crate::runner::BatchRunner;
use anyhow::{Context, Result};
use shared_utils::logging::Verbosity;
use shared_utils::tools::{ExternalTools, FFMPEG_ENV};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const EXIT_SUCCESS: u8 = 0;
/// No GIF was produced
pub const EXIT_NO_OUTPUT: u8 = 1;
/// The after-batch player failed
pub const EXIT_PLAYBACK: u8 = 2;

/// Convert `files`, record the command line in `history_file` (when that
/// file exists) and play the results if asked to.
pub fn run(
    files: &[PathBuf],
    config: &ConversionConfig,
    tools: &ExternalTools,
    history_file: Option<&Path>,
) -> Result<u8> {
    if let Err(e) = tools.require_ffmpeg() {
        error!("❌ {}", e);
        error!("💡 Install FFmpeg or set {} to its path", FFMPEG_ENV);
        return Ok(EXIT_NO_OUTPUT);
    }
    if config.play == PlayMode::AfterBatch && files.len() == 1 {
        debug!("Streamed playback unavailable, playing after conversion");
    }

    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let report = BatchRunner::new(config, tools)
        .with_progress(config.verbosity != Verbosity::Quiet)
        .run(files);

    let outputs = report.outputs();
    if outputs.is_empty() {
        return Ok(EXIT_NO_OUTPUT);
    }

    if let Some(path) = history_file {
        match history::append_history(path, std::env::args_os()) {
            Ok(true) => debug!("Command logged to {}", path.display()),
            Ok(false) => {}
            Err(e) => warn!("⚠️  Could not write {}: {}", path.display(), e),
        }
    }

    if config.play == PlayMode::AfterBatch {
        info!("");
        if let Err(e) = playback::play_files(tools, &outputs) {
            error!("❌ {}", e);
            return Ok(EXIT_PLAYBACK);
        }
    }

    Ok(EXIT_SUCCESS)
}
