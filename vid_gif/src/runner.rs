//! Batch Runner
//!
//! One [`Job`] per input. A lone input runs on the calling thread, a batch
//! goes through a rayon pool with one worker per CPU. Workers only run the
//! encoder and return a [`JobReport`]; all user-facing messages come from
//! the single aggregation step once every job has finished.
//!
//! Job lifecycle: Pending → Running → Succeeded | Skipped | Failed.
//! No retries. A failing (or panicking) job never affects its siblings.

use crate::command::{ffmpeg_args, output_path_for, OutputTarget, GIF_EXTENSION};
use crate::config::{ConversionConfig, PlayMode};
use crate::playback;
use rayon::prelude::*;
use shared_utils::batch::BatchResult;
use shared_utils::common_utils::{display_name, file_name_ends_with};
use shared_utils::errors::{GifError, Result};
use shared_utils::ffmpeg_process::FfmpegProcess;
use shared_utils::logging::Verbosity;
use shared_utils::progress::BatchProgressBar;
use shared_utils::thread_manager::{available_cpus, build_worker_pool};
use shared_utils::tools::ExternalTools;
use shared_utils::types::FileSize;
use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info, warn, Level};

// ═══════════════════════════════════════════════════════════════
// Job
// ═══════════════════════════════════════════════════════════════

/// Terminal state of one job.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded {
        output: PathBuf,
        size: FileSize,
        /// The output existed before this run
        overwrote: bool,
    },
    /// Bad input: missing, already a GIF, not a regular file
    Skipped(GifError),
    Failed(GifError),
}

#[derive(Debug)]
pub struct JobReport {
    pub input: PathBuf,
    pub outcome: JobOutcome,
    /// Whatever FFmpeg printed at the configured log level
    pub ffmpeg_log: String,
}

impl JobReport {
    pub fn output(&self) -> Option<&Path> {
        match &self.outcome {
            JobOutcome::Succeeded { output, .. } => Some(output),
            _ => None,
        }
    }
}

struct Converted {
    output: PathBuf,
    size: FileSize,
    overwrote: bool,
    ffmpeg_log: String,
}

/// One input file bound to the shared configuration.
pub struct Job<'a> {
    input: &'a Path,
    config: &'a ConversionConfig,
    tools: &'a ExternalTools,
}

impl<'a> Job<'a> {
    pub fn new(input: &'a Path, config: &'a ConversionConfig, tools: &'a ExternalTools) -> Self {
        Self {
            input,
            config,
            tools,
        }
    }

    /// Run to a terminal state. Errors and panics end up in the report.
    pub fn run(&self) -> JobReport {
        let (outcome, ffmpeg_log) = match panic::catch_unwind(AssertUnwindSafe(|| self.convert())) {
            Ok(Ok(done)) => (
                JobOutcome::Succeeded {
                    output: done.output,
                    size: done.size,
                    overwrote: done.overwrote,
                },
                done.ffmpeg_log,
            ),
            Ok(Err(e)) if e.is_skip() => (JobOutcome::Skipped(e), String::new()),
            Ok(Err(e)) => (JobOutcome::Failed(e), String::new()),
            Err(payload) => (
                JobOutcome::Failed(GifError::Panicked(panic_message(payload.as_ref()))),
                String::new(),
            ),
        };

        JobReport {
            input: self.input.to_path_buf(),
            outcome,
            ffmpeg_log,
        }
    }

    fn convert(&self) -> Result<Converted> {
        check_input(self.input)?;

        let output = output_path_for(self.input, self.config.output_dir.as_deref())?;
        let overwrote = output.exists();

        let ffmpeg_log = match self.config.play {
            PlayMode::Streamed => {
                let args = ffmpeg_args(self.config, self.input, &OutputTarget::Pipe);
                playback::run_play_pipeline(self.tools, &args, &output)?
            }
            PlayMode::Off | PlayMode::AfterBatch => {
                let mut cmd = Command::new(&self.tools.ffmpeg);
                cmd.args(ffmpeg_args(
                    self.config,
                    self.input,
                    &OutputTarget::File(output.clone()),
                ));
                FfmpegProcess::spawn(&mut cmd)?.wait_checked()?
            }
        };

        let size = FileSize::of(&output)?;
        Ok(Converted {
            output,
            size,
            overwrote,
            ffmpeg_log,
        })
    }
}

/// Classify inputs the encoder should never see.
fn check_input(input: &Path) -> Result<()> {
    let metadata = match fs::metadata(input) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(GifError::NotFound(input.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if file_name_ends_with(input, &format!(".{}", GIF_EXTENSION)) {
        return Err(GifError::AlreadyGif(input.to_path_buf()));
    }
    if !metadata.is_file() {
        return Err(GifError::NotRegularFile(input.to_path_buf()));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ═══════════════════════════════════════════════════════════════
// Batch
// ═══════════════════════════════════════════════════════════════

/// All job reports in input order, plus the counters.
#[derive(Debug)]
pub struct BatchReport {
    pub reports: Vec<JobReport>,
    pub result: BatchResult,
}

impl BatchReport {
    /// Produced GIFs, in input order.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.reports
            .iter()
            .filter_map(|r| r.output().map(Path::to_path_buf))
            .collect()
    }

    pub fn has_outputs(&self) -> bool {
        self.result.succeeded > 0
    }
}

/// Outputs written by more than one convertible input. The last writer wins.
pub fn find_output_collisions(
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut by_output: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for input in inputs.iter().filter(|i| check_input(i).is_ok()) {
        if let Ok(output) = output_path_for(input, output_dir) {
            by_output.entry(output).or_default().push(input.clone());
        }
    }
    by_output
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect()
}

pub struct BatchRunner<'a> {
    config: &'a ConversionConfig,
    tools: &'a ExternalTools,
    show_progress: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a ConversionConfig, tools: &'a ExternalTools) -> Self {
        Self {
            config,
            tools,
            show_progress: false,
        }
    }

    /// Show a progress bar for multi-file batches.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, inputs: &[PathBuf]) -> BatchReport {
        for (output, sources) in find_output_collisions(inputs, self.config.output_dir.as_deref()) {
            warn!(
                "⚠️  {} inputs convert to {}, only the last one finishing is kept",
                sources.len(),
                output.display()
            );
        }
        for input in inputs.iter().filter(|i| check_input(i).is_ok()) {
            if let Ok(output) = output_path_for(input, self.config.output_dir.as_deref()) {
                info!("Converting {} to {}...", display_name(input), display_name(&output));
            }
        }

        let reports = if inputs.len() <= 1 {
            inputs
                .iter()
                .map(|input| Job::new(input, self.config, self.tools).run())
                .collect()
        } else {
            self.run_parallel(inputs)
        };

        let result = aggregate(&reports, self.config.verbosity);
        if inputs.len() > 1 {
            info!("{}", result.summary_line());
            if let Some(line) = result.failures_line() {
                error!("❌ {}", line);
            }
            debug!("{:.0}% of inputs converted", result.success_rate());
        }

        BatchReport { reports, result }
    }

    fn run_parallel(&self, inputs: &[PathBuf]) -> Vec<JobReport> {
        let bar = BatchProgressBar::new(inputs.len() as u64, "Converting", self.show_progress);
        let run_one = |input: &PathBuf| {
            let report = Job::new(input, self.config, self.tools).run();
            bar.inc(&display_name(input));
            report
        };

        let reports: Vec<JobReport> = match build_worker_pool(available_cpus()) {
            Ok(pool) => pool.install(|| inputs.par_iter().map(run_one).collect()),
            Err(e) => {
                warn!("⚠️  {:#}, converting one file at a time", e);
                inputs.iter().map(run_one).collect()
            }
        };
        bar.finish();
        reports
    }
}

/// FFmpeg's own output for a job and the level to log it at.
///
/// Failed encoder runs show their whole stderr. Info output requested
/// with `-v` goes to debug.
fn encoder_output(report: &JobReport, verbosity: Verbosity) -> Option<(Level, &str)> {
    let (level, text) = match &report.outcome {
        JobOutcome::Failed(GifError::Ffmpeg(e)) => (Level::ERROR, e.stderr.as_str()),
        _ if verbosity == Verbosity::Verbose => (Level::DEBUG, report.ffmpeg_log.as_str()),
        _ => (Level::WARN, report.ffmpeg_log.as_str()),
    };
    let text = text.trim();
    (!text.is_empty()).then_some((level, text))
}

/// The one place that reports per-job results.
fn aggregate(reports: &[JobReport], verbosity: Verbosity) -> BatchResult {
    let mut result = BatchResult::new();

    for report in reports {
        if let Some((level, text)) = encoder_output(report, verbosity) {
            let name = display_name(&report.input);
            if level == Level::ERROR {
                error!("{}: {}", name, text);
            } else if level == Level::WARN {
                warn!("{}: {}", name, text);
            } else {
                debug!("{}: {}", name, text);
            }
        }

        match &report.outcome {
            JobOutcome::Succeeded {
                output,
                size,
                overwrote,
            } => {
                if *overwrote {
                    warn!("⚠️  Overwrote {}", output.display());
                }
                info!("✅ Completed {} ({}B)", display_name(output), size);
                result.success();
            }
            JobOutcome::Skipped(e) => {
                warn!("⚠️  {}", e);
                result.skip();
            }
            JobOutcome::Failed(e) => {
                error!("❌ Error converting {}: {}", report.input.display(), e);
                result.fail(report.input.clone());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::ffmpeg_process::FfmpegError;

    #[test]
    fn test_check_input_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.mov");
        assert!(matches!(check_input(&missing), Err(GifError::NotFound(_))));
    }

    #[test]
    fn test_check_input_gif_and_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let gif = dir.path().join("anim.GIF");
        fs::write(&gif, b"GIF89a").unwrap();
        assert!(matches!(check_input(&gif), Err(GifError::AlreadyGif(_))));

        let sub = dir.path().join("folder.mov");
        fs::create_dir(&sub).unwrap();
        assert!(matches!(check_input(&sub), Err(GifError::NotRegularFile(_))));

        let ok = dir.path().join("clip.mov");
        fs::write(&ok, b"video").unwrap();
        assert!(check_input(&ok).is_ok());
    }

    #[test]
    fn test_bare_gif_name_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let bare = dir.path().join(".gif");
        fs::write(&bare, b"GIF89a").unwrap();
        assert!(matches!(check_input(&bare), Err(GifError::AlreadyGif(_))));
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"video").unwrap();
        path
    }

    #[test]
    fn test_find_output_collisions() {
        let dir = tempfile::TempDir::new().unwrap();
        let inputs = vec![
            touch(dir.path(), "a/clip.mov"),
            touch(dir.path(), "b/clip.avi"),
            touch(dir.path(), "c/other.mp4"),
        ];
        let collisions = find_output_collisions(&inputs, None);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0, PathBuf::from("clip.gif"));
        assert_eq!(collisions[0].1, inputs[..2].to_vec());
    }

    #[test]
    fn test_skipped_inputs_do_not_collide() {
        let dir = tempfile::TempDir::new().unwrap();
        let inputs = vec![
            touch(dir.path(), "clip.gif"),
            touch(dir.path(), "clip.mov"),
            dir.path().join("missing/clip.mkv"),
        ];
        assert!(find_output_collisions(&inputs, None).is_empty());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_aggregate_counts() {
        let reports = vec![
            JobReport {
                input: PathBuf::from("a.mov"),
                outcome: JobOutcome::Succeeded {
                    output: PathBuf::from("a.gif"),
                    size: FileSize::new(2048),
                    overwrote: true,
                },
                ffmpeg_log: String::new(),
            },
            JobReport {
                input: PathBuf::from("b.gif"),
                outcome: JobOutcome::Skipped(GifError::AlreadyGif(PathBuf::from("b.gif"))),
                ffmpeg_log: String::new(),
            },
            JobReport {
                input: PathBuf::from("c.mov"),
                outcome: JobOutcome::Failed(GifError::Panicked("boom".to_string())),
                ffmpeg_log: "warning text".to_string(),
            },
        ];
        let result = aggregate(&reports, Verbosity::Normal);
        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures, vec![PathBuf::from("c.mov")]);
        assert_eq!(result.failures_line().as_deref(), Some("Failed: c.mov"));
        assert_eq!(result.summary_line(), "Converted 1 files (2 skips/failures)");
    }
    fn failed_report(stderr: &str) -> JobReport {
        let err = FfmpegError::new(
            "ffmpeg".to_string(),
            "ffmpeg -i clip.mov clip.gif".to_string(),
            Some(1),
            stderr.to_string(),
        );
        JobReport {
            input: PathBuf::from("clip.mov"),
            outcome: JobOutcome::Failed(GifError::Ffmpeg(err)),
            ffmpeg_log: String::new(),
        }
    }

    #[test]
    fn test_encoder_output_keeps_every_stderr_line_of_a_failure() {
        let stderr = "[Parsed_crop_2 @ 0x1] Invalid too big or non positive size for width '-10' or height '240'\n\
                      [Parsed_crop_2 @ 0x1] Failed to configure input pad on Parsed_crop_2\n\
                      Error reinitializing filters!\n";
        let report = failed_report(stderr);

        let (level, text) = encoder_output(&report, Verbosity::Normal).unwrap();
        assert_eq!(level, Level::ERROR);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("width '-10'"));
        assert!(text.contains("Failed to configure input pad"));
        assert!(text.ends_with("Error reinitializing filters!"));
    }

    #[test]
    fn test_encoder_output_levels() {
        let ok = JobReport {
            input: PathBuf::from("clip.mov"),
            outcome: JobOutcome::Succeeded {
                output: PathBuf::from("clip.gif"),
                size: FileSize::new(10),
                overwrote: false,
            },
            ffmpeg_log: "  Stream #0:0: Video: h264\n".to_string(),
        };
        assert_eq!(
            encoder_output(&ok, Verbosity::Normal),
            Some((Level::WARN, "Stream #0:0: Video: h264"))
        );
        assert_eq!(
            encoder_output(&ok, Verbosity::Verbose),
            Some((Level::DEBUG, "Stream #0:0: Video: h264"))
        );

        let quiet_ok = JobReport {
            ffmpeg_log: " \n".to_string(),
            ..ok
        };
        assert_eq!(encoder_output(&quiet_ok, Verbosity::Normal), None);
        assert_eq!(encoder_output(&failed_report(""), Verbosity::Quiet), None);
    }
}
