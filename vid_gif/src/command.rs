//! Command Synthesizer
//!
//! Turns a [`ConversionConfig`] plus one input into the exact FFmpeg argument
//! list. Pure: no file-system access, no process spawning, so every rule
//! below is testable on plain vectors.
//!
//! Filter order matters. Speed is changed before `fps` resamples, the crop
//! runs on the full frame before the size limit, denoising runs last on the
//! small picture right before the palette is built.

use crate::config::{ConversionConfig, Dither, PaletteConfig};
use crate::filter_graph::{FilterChain, FilterGraph};
use shared_utils::common_utils::safe_path_arg;
use shared_utils::errors::{GifError, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

pub const GIF_EXTENSION: &str = "gif";

/// Stream labels inside the palette graph
const SPLIT_A: &str = "tmp1";
const SPLIT_B: &str = "tmp2";
const PALETTE: &str = "pal";

/// Where FFmpeg writes the GIF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    /// GIF stream on stdout (`-`)
    Pipe,
}

impl OutputTarget {
    pub fn to_arg(&self) -> OsString {
        match self {
            OutputTarget::File(path) => safe_path_arg(path).into_owned().into_os_string(),
            OutputTarget::Pipe => OsString::from("-"),
        }
    }
}

/// `<output_dir>/<input stem>.gif`, or just `<stem>.gif` (current directory).
///
/// Inputs sharing a stem map to the same output; that is left to the caller
/// to warn about.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| GifError::NoFileName(input.to_path_buf()))?;

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(GIF_EXTENSION);

    Ok(match output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    })
}

/// Per-frame conversion filters, only the active ones.
pub fn conversion_filters(config: &ConversionConfig) -> Vec<String> {
    let mut filters = Vec::new();

    if let Some(ratio) = config.speed.ratio() {
        filters.push(format!("setpts={}*PTS", ratio));
    }
    if let Some(fps) = config.fps.value() {
        filters.push(format!("fps={}", fps));
    }
    if config.crop.is_active() {
        let c = config.crop.fractions();
        filters.push(format!(
            "crop=in_w*{}:in_h*{}:in_w*{}:in_h*{}",
            c.width, c.height, c.x, c.y
        ));
    }
    if let Some(scale) = config.scale.value() {
        // never upscales, aspect ratio kept
        filters.push(format!(
            "scale=min(iw\\,{0}):min(ih\\,{0}):force_original_aspect_ratio=decrease:flags=lanczos",
            scale
        ));
    }
    if config.denoise.pp {
        // the pp defaults leave visible artifacts
        filters.push("pp=tmpnoise|1|1|1".to_string());
    }
    if config.denoise.atadenoise {
        filters.push("atadenoise".to_string());
    }

    filters
}

pub fn palettegen_filter(palette: &PaletteConfig) -> String {
    let mut filter = format!(
        "palettegen=max_colors={}:reserve_transparent=off",
        palette.colors
    );
    if palette.diff_mode {
        filter.push_str(":stats_mode=diff");
    }
    filter
}

pub fn paletteuse_filter(dither: Dither) -> String {
    match dither.bayer_scale() {
        Some(scale) => format!("paletteuse=dither=bayer:bayer_scale={}", scale),
        None => format!("paletteuse=dither={}", dither.ffmpeg_name()),
    }
}

/// Conversion, then split into a palette branch and a mapping branch.
pub fn filter_graph(config: &ConversionConfig) -> FilterGraph {
    FilterGraph::new()
        .chain(
            FilterChain::new()
                .filters(conversion_filters(config))
                .filter("split")
                .output(SPLIT_A)
                .output(SPLIT_B),
        )
        .chain(
            FilterChain::new()
                .input(SPLIT_A)
                .filter(palettegen_filter(&config.palette))
                .output(PALETTE),
        )
        .chain(
            FilterChain::new()
                .input(SPLIT_B)
                .input(PALETTE)
                .filter(paletteuse_filter(config.dither)),
        )
}

/// Full FFmpeg argument list (program name excluded).
pub fn ffmpeg_args(config: &ConversionConfig, input: &Path, target: &OutputTarget) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(16);
    let mut push = |arg: &dyn AsRef<OsStr>| args.push(arg.as_ref().to_os_string());

    push(&"-y");
    push(&"-loglevel");
    push(&config.verbosity.ffmpeg_loglevel().to_string());

    // trimming goes before -i: fast input seeking
    if !config.start.is_zero() {
        push(&"-ss");
        push(&config.start.as_str());
    }
    if let Some(length) = config.length.value() {
        push(&"-t");
        push(&length.as_str());
    }

    push(&"-i");
    push(&safe_path_arg(input).as_os_str());
    push(&"-filter_complex");
    push(&filter_graph(config).to_string());
    push(&"-f");
    push(&GIF_EXTENSION);
    push(&target.to_arg());

    args
}
