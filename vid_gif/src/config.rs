//! Conversion configuration
//!
//! One immutable [`ConversionConfig`] per invocation, validated at parse time
//! and shared by reference with every job. Values that FFmpeg would only
//! reject halfway through a batch (unknown dither, impossible crop, colors
//! out of range) are refused here instead.

use shared_utils::logging::Verbosity;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid time '{0}' (expected [-][HH:]MM:SS[.m...] or S[.m...] with optional s/ms/us suffix)")]
    InvalidTime(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("length must not be negative: {0}")]
    NegativeLength(String),

    #[error("unknown dither '{0}' (expected none, floyd_steinberg, sierra2, sierra2_4a, bayer, bayer1..bayer5)")]
    UnknownDither(String),

    #[error("colors must be between {min} and {max}, got {value}")]
    ColorsOutOfRange { value: u32, min: u16, max: u16 },

    #[error("crop {side} must be between 0 and 100, got {value}")]
    CropOutOfRange { side: &'static str, value: f64 },

    #[error("crop {0} must add up to less than 100")]
    CropTooLarge(&'static str),

    #[error("--slower and --faster cannot be combined")]
    ConflictingSpeed,

    #[error("speed percentage must be >= 0, got {0}")]
    NegativeSpeed(f64),

    #[error("--faster must be below 100, got {0}")]
    TooFast(f64),
}

// ═══════════════════════════════════════════════════════════════
// Limit<T>
// ═══════════════════════════════════════════════════════════════

/// A value that can be switched off with `max` / `off`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit<T> {
    Unbounded,
    Value(T),
}

/// Values usable inside a [`Limit`]. Zero means "no limit".
pub trait LimitValue: Sized {
    fn parse_value(s: &str) -> Result<Self, ConfigError>;
    fn is_zero(&self) -> bool;
}

impl<T: LimitValue> Limit<T> {
    /// Wrap a value, normalizing zero to [`Limit::Unbounded`].
    pub fn from_value(value: T) -> Self {
        if value.is_zero() {
            Limit::Unbounded
        } else {
            Limit::Value(value)
        }
    }
}

impl<T> Limit<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Limit::Unbounded => None,
            Limit::Value(v) => Some(v),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Limit::Unbounded)
    }
}

impl<T: LimitValue> FromStr for Limit<T> {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") || s.eq_ignore_ascii_case("off") {
            return Ok(Limit::Unbounded);
        }
        T::parse_value(s).map(Limit::from_value)
    }
}

impl LimitValue for f64 {
    fn parse_value(s: &str) -> Result<Self, ConfigError> {
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(ConfigError::InvalidNumber(s.to_string())),
        }
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl LimitValue for u32 {
    fn parse_value(s: &str) -> Result<Self, ConfigError> {
        s.parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber(s.to_string()))
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl LimitValue for TimeSpec {
    fn parse_value(s: &str) -> Result<Self, ConfigError> {
        let time: TimeSpec = s.parse()?;
        if time.is_negative() {
            return Err(ConfigError::NegativeLength(s.to_string()));
        }
        Ok(time)
    }

    fn is_zero(&self) -> bool {
        TimeSpec::is_zero(self)
    }
}

// ═══════════════════════════════════════════════════════════════
// TimeSpec
// ═══════════════════════════════════════════════════════════════

/// An FFmpeg time duration, kept as typed so FFmpeg sees the user's text.
///
/// Accepted: `[-][HH:]MM:SS[.m...]` and `[-]S[.m...][s|ms|us]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSpec {
    text: String,
    seconds: f64,
}

impl TimeSpec {
    /// Whole seconds, e.g. the default length of 10.
    pub fn from_secs(secs: u32) -> Self {
        Self {
            text: secs.to_string(),
            seconds: f64::from(secs),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0.0
    }
}

impl Default for TimeSpec {
    fn default() -> Self {
        Self::from_secs(0)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Digits with an optional fractional part, no sign, no exponent.
fn parse_decimal(s: &str) -> Option<f64> {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let digits_ok = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !digits_ok(int) || !frac.map_or(true, digits_ok) {
        return None;
    }
    if int.is_empty() && frac.map_or(true, str::is_empty) {
        return None;
    }
    s.parse::<f64>().ok()
}

fn parse_integer(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok()
}

impl FromStr for TimeSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ConfigError::InvalidTime(s.to_string());

        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let seconds = if body.contains(':') {
            let parts: Vec<&str> = body.split(':').collect();
            let (hours, minutes, secs) = match parts.as_slice() {
                [m, s] => (0.0, parse_integer(m), parse_decimal(s)),
                [h, m, s] => (parse_integer(h).ok_or_else(invalid)?, parse_integer(m), parse_decimal(s)),
                _ => return Err(invalid()),
            };
            let minutes = minutes.ok_or_else(invalid)?;
            let secs = secs.ok_or_else(invalid)?;
            hours * 3600.0 + minutes * 60.0 + secs
        } else {
            let (number, scale) = if let Some(n) = body.strip_suffix("ms") {
                (n, 1e-3)
            } else if let Some(n) = body.strip_suffix("us") {
                (n, 1e-6)
            } else if let Some(n) = body.strip_suffix('s') {
                (n, 1.0)
            } else {
                (body, 1.0)
            };
            parse_decimal(number).ok_or_else(invalid)? * scale
        };

        Ok(Self {
            text: text.to_string(),
            seconds: if negative { -seconds } else { seconds },
        })
    }
}

// ═══════════════════════════════════════════════════════════════
// Palette / dither / denoise
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteConfig {
    /// `palettegen` max_colors
    pub colors: u16,
    /// Only count pixels that change between frames
    pub diff_mode: bool,
}

impl PaletteConfig {
    /// Range accepted by FFmpeg's palettegen.
    pub const MIN_COLORS: u16 = 4;
    pub const MAX_COLORS: u16 = 256;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_COLORS..=Self::MAX_COLORS).contains(&self.colors) {
            return Err(ConfigError::ColorsOutOfRange {
                value: u32::from(self.colors),
                min: Self::MIN_COLORS,
                max: Self::MAX_COLORS,
            });
        }
        Ok(())
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: 256,
            diff_mode: true,
        }
    }
}

/// `paletteuse` dithering algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dither {
    None,
    FloydSteinberg,
    Sierra2,
    #[default]
    Sierra2_4a,
    /// Ordered dithering; `scale` 1..=5 sets the pattern strength
    Bayer { scale: Option<u8> },
}

impl Dither {
    pub const MAX_BAYER_SCALE: u8 = 5;

    /// Names accepted on the command line.
    pub const NAMES: &'static [&'static str] = &[
        "none",
        "floyd_steinberg",
        "sierra2",
        "sierra2_4a",
        "bayer",
        "bayer1",
        "bayer2",
        "bayer3",
        "bayer4",
        "bayer5",
    ];

    /// Value of paletteuse's `dither` option.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Dither::None => "none",
            Dither::FloydSteinberg => "floyd_steinberg",
            Dither::Sierra2 => "sierra2",
            Dither::Sierra2_4a => "sierra2_4a",
            Dither::Bayer { .. } => "bayer",
        }
    }

    pub fn bayer_scale(self) -> Option<u8> {
        match self {
            Dither::Bayer { scale } => scale,
            _ => None,
        }
    }
}

impl FromStr for Dither {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dither = match s {
            "none" => Dither::None,
            "floyd_steinberg" => Dither::FloydSteinberg,
            "sierra2" => Dither::Sierra2,
            "sierra2_4a" => Dither::Sierra2_4a,
            "bayer" => Dither::Bayer { scale: None },
            other => match other.strip_prefix("bayer").map(str::parse::<u8>) {
                Some(Ok(scale)) if (1..=Self::MAX_BAYER_SCALE).contains(&scale) => {
                    Dither::Bayer { scale: Some(scale) }
                }
                _ => return Err(ConfigError::UnknownDither(s.to_string())),
            },
        };
        Ok(dither)
    }
}

impl fmt::Display for Dither {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bayer_scale() {
            Some(scale) => write!(f, "bayer{}", scale),
            None => f.write_str(self.ffmpeg_name()),
        }
    }
}

/// Independent denoise filters; both may be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Denoise {
    /// libpostproc `tmpnoise`, pairs well with bayer dithering
    pub pp: bool,
    /// `atadenoise`, pairs well with sierra dithering
    pub atadenoise: bool,
}

// ═══════════════════════════════════════════════════════════════
// Crop / speed
// ═══════════════════════════════════════════════════════════════

/// Crop percentages per side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Crop {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Crop rectangle as fractions of the input size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFractions {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl Crop {
    pub fn is_active(&self) -> bool {
        self.left != 0.0 || self.right != 0.0 || self.top != 0.0 || self.bottom != 0.0
    }

    pub fn fractions(&self) -> CropFractions {
        CropFractions {
            width: 1.0 - (self.left + self.right) / 100.0,
            height: 1.0 - (self.top + self.bottom) / 100.0,
            x: self.left / 100.0,
            y: self.top / 100.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (side, value) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::CropOutOfRange { side, value });
            }
        }
        if self.left + self.right >= 100.0 {
            return Err(ConfigError::CropTooLarge("left + right"));
        }
        if self.top + self.bottom >= 100.0 {
            return Err(ConfigError::CropTooLarge("top + bottom"));
        }
        Ok(())
    }
}

/// Playback speed change in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Speed {
    #[default]
    Normal,
    Slower(f64),
    Faster(f64),
}

impl Speed {
    /// Combine the mutually exclusive `--slower` / `--faster` flags.
    pub fn from_flags(slower: Option<f64>, faster: Option<f64>) -> Result<Self, ConfigError> {
        let speed = match (slower, faster) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSpeed),
            (Some(pct), None) => Speed::Slower(pct),
            (None, Some(pct)) => Speed::Faster(pct),
            (None, None) => Speed::Normal,
        };
        speed.validate()?;
        Ok(speed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Speed::Normal => Ok(()),
            Speed::Slower(pct) | Speed::Faster(pct) if !(pct >= 0.0) => {
                Err(ConfigError::NegativeSpeed(pct))
            }
            Speed::Faster(pct) if pct >= 100.0 => Err(ConfigError::TooFast(pct)),
            _ => Ok(()),
        }
    }

    /// `setpts` multiplier, `None` when the speed is unchanged.
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Speed::Slower(pct) if pct > 0.0 => Some(1.0 + pct / 100.0),
            Speed::Faster(pct) if pct > 0.0 => Some(1.0 - pct / 100.0),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// ConversionConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    #[default]
    Off,
    /// One player run over all outputs once the batch is done
    AfterBatch,
    /// encoder → tee → player, watching while the GIF is still being written
    Streamed,
}

/// Everything needed to turn one input into one GIF.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Zero means "from the beginning"
    pub start: TimeSpec,
    pub length: Limit<TimeSpec>,
    pub fps: Limit<f64>,
    /// Maximum width and height, never upscales
    pub scale: Limit<u32>,
    pub palette: PaletteConfig,
    pub dither: Dither,
    pub denoise: Denoise,
    pub crop: Crop,
    pub speed: Speed,
    pub verbosity: Verbosity,
    pub play: PlayMode,
    /// Where outputs go; the current directory when `None`
    pub output_dir: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            start: TimeSpec::default(),
            length: Limit::Value(TimeSpec::from_secs(10)),
            fps: Limit::Value(20.0),
            scale: Limit::Value(500),
            palette: PaletteConfig::default(),
            dither: Dither::default(),
            denoise: Denoise::default(),
            crop: Crop::default(),
            speed: Speed::default(),
            verbosity: Verbosity::default(),
            play: PlayMode::default(),
            output_dir: None,
        }
    }
}

impl ConversionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.palette.validate()?;
        self.crop.validate()?;
        self.speed.validate()?;
        if let Some(length) = self.length.value() {
            if length.is_negative() {
                return Err(ConfigError::NegativeLength(length.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert!(config.start.is_zero());
        assert_eq!(config.length.value().map(TimeSpec::as_str), Some("10"));
        assert_eq!(config.fps, Limit::Value(20.0));
        assert_eq!(config.scale, Limit::Value(500));
        assert_eq!(config.palette.colors, 256);
        assert!(config.palette.diff_mode);
        assert_eq!(config.dither, Dither::Sierra2_4a);
        assert_eq!(config.play, PlayMode::Off);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_time_spec_formats() {
        let cases = [
            ("10", 10.0),
            ("0.2", 0.2),
            ("1:30", 90.0),
            ("0:0:26.5", 26.5),
            ("01:02:03.5", 3723.5),
            ("1500ms", 1.5),
            ("250000us", 0.25),
            ("3s", 3.0),
            ("-2", -2.0),
            (".5", 0.5),
        ];
        for (text, secs) in cases {
            let t: TimeSpec = text.parse().unwrap();
            assert!((t.seconds - secs).abs() < 1e-9, "{} -> {}", text, t.seconds);
            assert_eq!(t.as_str(), text);
        }
    }

    #[test]
    fn test_time_spec_rejects_garbage() {
        for text in ["", "abc", "1:2:3:4", "1e3", "1:x", "+5", ".", "5m", ":30"] {
            assert!(text.parse::<TimeSpec>().is_err(), "{} should be rejected", text);
        }
    }

    #[test]
    fn test_time_spec_zero() {
        for text in ["0", "0.0", "00:00", "0:00:00.000", "0ms"] {
            assert!(text.parse::<TimeSpec>().unwrap().is_zero(), "{}", text);
        }
    }

    #[test]
    fn test_limit_sentinels() {
        assert_eq!("max".parse::<Limit<f64>>().unwrap(), Limit::Unbounded);
        assert_eq!("off".parse::<Limit<u32>>().unwrap(), Limit::Unbounded);
        assert_eq!("MAX".parse::<Limit<u32>>().unwrap(), Limit::Unbounded);
        assert!("max".parse::<Limit<TimeSpec>>().unwrap().is_unbounded());
        assert_eq!("25".parse::<Limit<f64>>().unwrap(), Limit::Value(25.0));
        assert_eq!("320".parse::<Limit<u32>>().unwrap(), Limit::Value(320));
    }

    #[test]
    fn test_limit_zero_is_unbounded() {
        assert_eq!("0".parse::<Limit<f64>>().unwrap(), Limit::Unbounded);
        assert_eq!("0".parse::<Limit<u32>>().unwrap(), Limit::Unbounded);
        assert!("00:00".parse::<Limit<TimeSpec>>().unwrap().is_unbounded());
        assert_eq!(Limit::from_value(0u32), Limit::Unbounded);
    }

    #[test]
    fn test_limit_rejects_invalid() {
        assert!("-1".parse::<Limit<f64>>().is_err());
        assert!("NaN".parse::<Limit<f64>>().is_err());
        assert!("inf".parse::<Limit<f64>>().is_err());
        assert!("-5".parse::<Limit<u32>>().is_err());
        assert!(matches!(
            "-5".parse::<Limit<TimeSpec>>(),
            Err(ConfigError::NegativeLength(_))
        ));
    }

    #[test]
    fn test_dither_parse_and_display() {
        for name in Dither::NAMES {
            let dither: Dither = name.parse().unwrap();
            assert_eq!(&dither.to_string(), name);
        }
        assert_eq!("bayer".parse::<Dither>().unwrap(), Dither::Bayer { scale: None });
        assert_eq!(
            "bayer4".parse::<Dither>().unwrap(),
            Dither::Bayer { scale: Some(4) }
        );
        for bad in ["bayer0", "bayer6", "bayerx", "sierra", "Sierra2", ""] {
            assert!(bad.parse::<Dither>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_colors_range() {
        let mut palette = PaletteConfig::default();
        for ok in [4, 128, 256] {
            palette.colors = ok;
            assert!(palette.validate().is_ok());
        }
        for bad in [0, 3, 257] {
            palette.colors = bad;
            assert!(matches!(
                palette.validate(),
                Err(ConfigError::ColorsOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_crop_validation() {
        let ok = Crop {
            left: 1.5,
            right: 15.0,
            top: 5.0,
            bottom: 0.0,
        };
        assert!(ok.validate().is_ok());
        assert!(ok.is_active());
        assert!(!Crop::default().is_active());

        let too_wide = Crop {
            left: 60.0,
            right: 40.0,
            ..Crop::default()
        };
        assert_eq!(too_wide.validate(), Err(ConfigError::CropTooLarge("left + right")));

        let negative = Crop {
            bottom: -1.0,
            ..Crop::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::CropOutOfRange { side: "bottom", .. })
        ));
    }

    #[test]
    fn test_crop_fractions() {
        let crop = Crop {
            left: 10.0,
            right: 20.0,
            top: 25.0,
            bottom: 25.0,
        };
        let f = crop.fractions();
        assert!((f.width - 0.7).abs() < 1e-12);
        assert!((f.height - 0.5).abs() < 1e-12);
        assert!((f.x - 0.1).abs() < 1e-12);
        assert!((f.y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_speed() {
        assert_eq!(Speed::from_flags(None, None).unwrap().ratio(), None);
        let slower = Speed::from_flags(Some(40.0), None).unwrap().ratio().unwrap();
        assert!((slower - 1.4).abs() < 1e-12);
        let faster = Speed::from_flags(None, Some(50.0)).unwrap().ratio().unwrap();
        assert!((faster - 0.5).abs() < 1e-12);
        assert_eq!(Speed::from_flags(Some(0.0), None).unwrap().ratio(), None);
        assert_eq!(
            Speed::from_flags(Some(10.0), Some(10.0)),
            Err(ConfigError::ConflictingSpeed)
        );
        assert_eq!(Speed::from_flags(None, Some(100.0)), Err(ConfigError::TooFast(100.0)));
        assert_eq!(Speed::from_flags(Some(-5.0), None), Err(ConfigError::NegativeSpeed(-5.0)));
    }
}
