//! Logging Module
//!
//! tracing-based logging for the command-line tools:
//! - plain messages on stderr, level driven by `-q`/`-v`
//! - optional daily-rotated log file (set `VID_GIF_LOG_DIR`)
//! - `RUST_LOG` overrides the computed filter
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig, Verbosity};
//! use tracing::info;
//!
//! let config = LogConfig::for_verbosity(Verbosity::Normal);
//! init_logging("vid_gif", config).expect("Failed to initialize logging");
//!
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable naming a directory for the log file.
pub const LOG_DIR_ENV: &str = "VID_GIF_LOG_DIR";

/// Crates whose events pass the default filter.
const LOG_TARGETS: &[&str] = &["vid_gif", "shared_utils"];

// ═══════════════════════════════════════════════════════════════
// Verbosity
// ═══════════════════════════════════════════════════════════════

/// Three output tiers shared by our own logs and FFmpeg's `-loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// `-q` maps to -1, each `-v` adds one.
    pub fn from_level(level: i8) -> Self {
        match level {
            i8::MIN..=-1 => Verbosity::Quiet,
            0 => Verbosity::Normal,
            _ => Verbosity::Verbose,
        }
    }

    pub fn tracing_level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Normal => Level::INFO,
            Verbosity::Verbose => Level::DEBUG,
        }
    }

    /// Numeric FFmpeg `-loglevel`: 16 error, 24 warning, 32 info.
    pub fn ffmpeg_loglevel(self) -> u8 {
        match self {
            Verbosity::Quiet => 16,
            Verbosity::Normal => 24,
            Verbosity::Verbose => 32,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// LogConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rotating log file; no file logging when `None`
    pub log_dir: Option<PathBuf>,
    /// Log files kept after cleanup, default 5
    pub max_files: usize,
    /// Console and file level, default Info
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            max_files: 5,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level from the verbosity tier, log directory from `VID_GIF_LOG_DIR`.
    pub fn for_verbosity(verbosity: Verbosity) -> Self {
        let config = Self::new().with_level(verbosity.tracing_level());
        match std::env::var_os(LOG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => config.with_log_dir(dir),
            _ => config,
        }
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Default filter directive, e.g. `vid_gif=info,shared_utils=info`.
    pub fn filter_directive(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber. Can only succeed once per process.
///
/// Log file name: `{program_name}.log.<date>` inside `config.log_dir`.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    // Messages only: the console output is for people, not machines
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .without_time();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

            let log_file_name = format!("{}.log", program_name);
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, &log_file_name);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = &config.log_dir {
        tracing::debug!(
            program = program_name,
            log_dir = ?dir,
            max_files = config.max_files,
            level = ?config.level,
            "File logging enabled"
        );
        cleanup_old_logs(dir, program_name, config.max_files)?;
    }

    Ok(())
}

/// Remove all but the newest `max_files` log files of `program_name`.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(file_name) = path.file_name() {
            let file_name_str = file_name.to_string_lossy();
            if file_name_str.starts_with(program_name) && file_name_str.contains(".log") {
                if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
                    log_files.push((path, modified));
                }
            }
        }
    }

    if log_files.len() > max_files {
        // newest first
        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in log_files.iter().skip(max_files) {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = ?path, error = %e, "Failed to remove old log file");
            } else {
                tracing::debug!(path = ?path, "Removed old log file");
            }
        }
    }

    Ok(())
}
