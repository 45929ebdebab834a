use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use shared_utils::logging::{init_logging, LogConfig, Verbosity};
use shared_utils::tools::ExternalTools;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use vid_gif::app::{self, EXIT_NO_OUTPUT};
use vid_gif::config::ConfigError;
use vid_gif::{
    history, ConversionConfig, Crop, Denoise, Dither, Limit, PaletteConfig, PlayMode, Speed,
    TimeSpec,
};

#[derive(Parser, Debug)]
#[command(name = "vid-gif")]
#[command(version, about = "Convert videos to optimized GIFs with FFmpeg", long_about = None)]
struct Cli {
    /// Start time offset, e.g. 12.5 or 1:02:03
    #[arg(short = 's', long, default_value = "0", value_name = "TIME")]
    start: TimeSpec,

    /// Length of output. Pass "max" to disable
    #[arg(short = 'l', long, default_value = "10", value_name = "TIME")]
    length: Limit<TimeSpec>,

    /// Frames per second. Pass "max" to disable
    #[arg(short = 'f', long, default_value = "20")]
    fps: Limit<f64>,

    /// Maximum dimensions of output. Pass "max" to disable.
    /// Aspect ratio is always kept and will never be upscaled
    #[arg(short = 'd', long, default_value = "500", value_name = "PIXELS")]
    scale: Limit<u32>,

    /// Maximum colors in palette
    #[arg(
        short = 'c',
        long,
        default_value_t = PaletteConfig::MAX_COLORS,
        value_parser = clap::value_parser!(u16).range(
            i64::from(PaletteConfig::MIN_COLORS)..=i64::from(PaletteConfig::MAX_COLORS)
        )
    )]
    colors: u16,

    /// Build the palette from the whole frames, not only the changing pixels
    #[arg(long = "no-palette-diff", action = ArgAction::SetFalse)]
    palette_diff: bool,

    /// Dithering algorithm
    #[arg(
        long,
        default_value = "sierra2_4a",
        value_parser = PossibleValuesParser::new(Dither::NAMES.iter().copied())
            .try_map(|s| s.parse::<Dither>())
    )]
    dither: Dither,

    /// Reduce noise with the libpostproc tmpnoise filter. Works well with --dither=bayer
    #[arg(long)]
    ppdenoise: bool,

    /// Reduce noise with FFmpeg's atadenoise filter. Works well with sierra dithering
    #[arg(long)]
    atadenoise: bool,

    /// Play the result (streamed while converting a single file on Linux)
    #[arg(short = 'p', long)]
    play: bool,

    /// Crop percentage from left side
    #[arg(long = "crop-left", visible_alias = "left", default_value_t = 0.0, value_name = "PCT")]
    crop_left: f64,

    /// Crop percentage from right side
    #[arg(long = "crop-right", visible_alias = "right", default_value_t = 0.0, value_name = "PCT")]
    crop_right: f64,

    /// Crop percentage from top
    #[arg(long = "crop-top", visible_alias = "top", default_value_t = 0.0, value_name = "PCT")]
    crop_top: f64,

    /// Crop percentage from bottom
    #[arg(long = "crop-bottom", visible_alias = "bottom", default_value_t = 0.0, value_name = "PCT")]
    crop_bottom: f64,

    /// Make video slower by percent
    #[arg(long, value_name = "PCT", conflicts_with = "faster")]
    slower: Option<f64>,

    /// Make video faster by percent (below 100)
    #[arg(long, value_name = "PCT")]
    faster: Option<f64>,

    /// Silence information messages
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// More verbose output (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Directory for the GIFs (default: current directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Input videos
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::from_level(-1)
        } else {
            Verbosity::from_level(i8::try_from(self.verbose).unwrap_or(i8::MAX))
        }
    }

    /// Streaming needs exactly one input and a usable `tee`.
    fn play_mode(&self, streaming_supported: bool) -> PlayMode {
        if !self.play {
            PlayMode::Off
        } else if self.files.len() == 1 && streaming_supported {
            PlayMode::Streamed
        } else {
            PlayMode::AfterBatch
        }
    }

    fn to_config(&self, streaming_supported: bool) -> Result<ConversionConfig, ConfigError> {
        let config = ConversionConfig {
            start: self.start.clone(),
            length: self.length.clone(),
            fps: self.fps,
            scale: self.scale,
            palette: PaletteConfig {
                colors: self.colors,
                diff_mode: self.palette_diff,
            },
            dither: self.dither,
            denoise: Denoise {
                pp: self.ppdenoise,
                atadenoise: self.atadenoise,
            },
            crop: Crop {
                left: self.crop_left,
                right: self.crop_right,
                top: self.crop_top,
                bottom: self.crop_bottom,
            },
            speed: Speed::from_flags(self.slower, self.faster)?,
            verbosity: self.verbosity(),
            play: self.play_mode(streaming_supported),
            output_dir: self.output_dir.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let tools = ExternalTools::from_env();

    let config = match cli.to_config(tools.supports_streaming()) {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    if let Err(e) = init_logging("vid_gif", LogConfig::for_verbosity(config.verbosity)) {
        eprintln!("⚠️  Logging setup failed: {:#}", e);
    }

    let history_file = history::history_path();
    match app::run(&cli.files, &config, &tools, history_file.as_deref()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::from(EXIT_NO_OUTPUT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vid-gif").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let config = parse(&["clip.mov"]).to_config(false).unwrap();
        assert_eq!(config, ConversionConfig::default());
    }

    #[test]
    fn test_every_flag() {
        let cli = parse(&[
            "--start=0:0:26.5",
            "--length=0.2",
            "--fps=25",
            "--scale=150",
            "--colors=128",
            "--no-palette-diff",
            "--dither=bayer3",
            "--ppdenoise",
            "--atadenoise",
            "--crop-left=1.5",
            "--crop-right=15",
            "--top=5",
            "--bottom=0",
            "--slower=40",
            "-vv",
            "-o",
            "out",
            "clip.mov",
        ]);
        let config = cli.to_config(true).unwrap();
        assert_eq!(config.start.as_str(), "0:0:26.5");
        assert_eq!(config.length.value().map(TimeSpec::as_str), Some("0.2"));
        assert_eq!(config.fps, Limit::Value(25.0));
        assert_eq!(config.scale, Limit::Value(150));
        assert_eq!(config.palette.colors, 128);
        assert!(!config.palette.diff_mode);
        assert_eq!(config.dither, Dither::Bayer { scale: Some(3) });
        assert!(config.denoise.pp && config.denoise.atadenoise);
        assert_eq!(config.crop.left, 1.5);
        assert_eq!(config.crop.top, 5.0);
        assert_eq!(config.speed, Speed::Slower(40.0));
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.play, PlayMode::Off);
    }

    #[test]
    fn test_sentinels() {
        let config = parse(&["-l", "max", "-f", "max", "-d", "off", "a.mov"])
            .to_config(false)
            .unwrap();
        assert!(config.length.is_unbounded());
        assert!(config.fps.is_unbounded());
        assert!(config.scale.is_unbounded());
    }

    #[test]
    fn test_play_modes() {
        let single = parse(&["-p", "a.mov"]);
        assert_eq!(single.play_mode(true), PlayMode::Streamed);
        assert_eq!(single.play_mode(false), PlayMode::AfterBatch);
        assert_eq!(parse(&["-p", "a.mov", "b.mov"]).play_mode(true), PlayMode::AfterBatch);
        assert_eq!(parse(&["a.mov"]).play_mode(true), PlayMode::Off);
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["-q", "a.mov"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["a.mov"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["-v", "a.mov"]).verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_rejected_at_parse_time() {
        let fails = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("vid-gif").chain(args.iter().copied())).is_err()
        };
        assert!(fails(&[]));
        assert!(fails(&["--dither=bayer9", "a.mov"]));
        assert!(fails(&["--colors=2", "a.mov"]));
        assert!(fails(&["--colors=300", "a.mov"]));
        assert!(fails(&["--fps=fast", "a.mov"]));
        assert!(fails(&["--start=soon", "a.mov"]));
        assert!(fails(&["--slower=10", "--faster=10", "a.mov"]));
        assert!(fails(&["-q", "-v", "a.mov"]));
    }

    #[test]
    fn test_rejected_by_validation() {
        assert_eq!(
            parse(&["--left=60", "--right=40", "a.mov"]).to_config(false),
            Err(ConfigError::CropTooLarge("left + right"))
        );
        assert_eq!(
            parse(&["--faster=100", "a.mov"]).to_config(false),
            Err(ConfigError::TooFast(100.0))
        );
    }
}
