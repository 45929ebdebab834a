//! vid-gif - Video to GIF conversion through FFmpeg palettes
//!
//! Every GIF is made in a single FFmpeg run: the (optionally trimmed,
//! re-timed, cropped, scaled and denoised) video is split in two, one half
//! builds an optimized palette, the other half is mapped onto it with the
//! chosen dithering.
//!
//! ```rust,ignore
//! use vid_gif::{BatchRunner, ConversionConfig};
//! use shared_utils::ExternalTools;
//! use std::path::PathBuf;
//!
//! let config = ConversionConfig::default();
//! let tools = ExternalTools::from_env();
//! let report = BatchRunner::new(&config, &tools).run(&[PathBuf::from("clip.mov")]);
//! println!("{}", report.result.summary_line());
//! ```

pub mod app;
pub mod command;
pub mod config;
pub mod filter_graph;
pub mod history;
pub mod playback;
pub mod runner;

#[cfg(all(test, unix))]
mod test_support;

pub use command::{ffmpeg_args, filter_graph, output_path_for, OutputTarget};
pub use config::{
    ConfigError, ConversionConfig, Crop, Denoise, Dither, Limit, PaletteConfig, PlayMode, Speed,
    TimeSpec,
};
pub use runner::{BatchReport, BatchRunner, Job, JobOutcome, JobReport};
