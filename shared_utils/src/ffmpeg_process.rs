//! FFmpeg process management - deadlock-free child handling
//!
//! ## Background
//!
//! A child whose stderr is piped but never read blocks as soon as the pipe
//! buffer (typically 64KB) fills up. FFmpeg can easily print that much on a
//! bad input, and the parent then waits forever on a child that waits on
//! the parent.
//!
//! [`FfmpegProcess`] drains stderr on its own thread so the child can always
//! make progress, and keeps the captured text for error reports.
//!
//! ## Usage
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.arg("-i").arg("clip.mov").arg("clip.gif");
//!
//! let process = FfmpegProcess::spawn(&mut cmd)?;
//! let stderr = process.wait_checked()?;
//! ```

use crate::common_utils::command_line;
use crate::errors::{GifError, Result};
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════
// FfmpegProcess
// ═══════════════════════════════════════════════════════════════

/// Child process wrapper that consumes stderr in the background.
pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
    tool: String,
    command: String,
}

impl FfmpegProcess {
    /// Start the process with stderr piped and drained, stdin detached.
    ///
    /// stdout is left as the caller configured it, so the output can go to
    /// a file, the terminal or a pipe into the next process.
    ///
    /// # Errors
    /// - [`GifError::ToolNotFound`] if the program does not exist
    /// - [`GifError::Io`] for any other spawn failure
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        Self::spawn_with_stdin(cmd, Stdio::null())
    }

    /// Like [`spawn`](Self::spawn), but reading from `stdin`, usually the
    /// stdout of the previous pipeline stage.
    pub fn spawn_with_stdin(cmd: &mut Command, stdin: Stdio) -> Result<Self> {
        let tool = cmd.get_program().to_string_lossy().into_owned();
        let command = command_line(cmd);
        debug!("Running: {}", command);

        cmd.stdin(stdin).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&tool, e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other(format!("Failed to capture {} stderr", tool)))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(std::result::Result::ok) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
            tool,
            command,
        })
    }

    /// Take stdout (ownership moves to the caller, e.g. the next pipeline stage).
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Wait for exit and collect the drained stderr.
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait()?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        debug!(
            tool = %self.tool,
            exit_code = ?status.code(),
            "Process finished"
        );

        Ok((status, stderr))
    }

    /// Wait for exit; a non-zero status becomes an [`FfmpegError`].
    ///
    /// On success the captured stderr is returned (FFmpeg only prints
    /// warnings and errors at our log levels, so callers may surface it).
    pub fn wait_checked(self) -> Result<String> {
        let tool = self.tool.clone();
        let command = self.command.clone();
        let (status, stderr) = self.wait_with_output()?;

        if status.success() {
            Ok(stderr)
        } else {
            Err(FfmpegError::new(tool, command, status.code(), stderr).into())
        }
    }

    pub fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}

fn spawn_error(tool: &str, err: io::Error) -> GifError {
    if err.kind() == io::ErrorKind::NotFound {
        GifError::ToolNotFound(tool.to_string())
    } else {
        GifError::Io(err)
    }
}

// ═══════════════════════════════════════════════════════════════
// Error reporting
// ═══════════════════════════════════════════════════════════════

/// Pick the most meaningful line out of FFmpeg's stderr.
///
/// 1. the last line mentioning "Error"/"error"
/// 2. otherwise the last non-empty line that is not a progress line
/// 3. otherwise "Unknown FFmpeg error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// Map common FFmpeg failure messages to a hint for the user.
pub fn get_error_suggestion(stderr: &str) -> Option<&'static str> {
    const PATTERNS: &[(&str, &str)] = &[
        ("No such file or directory", "check that the input path is correct"),
        (
            "Invalid data found",
            "the input is damaged or not a video FFmpeg can decode",
        ),
        (
            "No such filter: 'pp'",
            "this FFmpeg build lacks libpostproc, drop --ppdenoise",
        ),
        ("No such filter", "this FFmpeg build lacks a required filter"),
        ("Permission denied", "check read/write permissions"),
        (
            "Output file is empty",
            "nothing was encoded, check --start/--length against the clip duration",
        ),
        (
            "Invalid too big or non positive size",
            "the crop or scale values leave no picture",
        ),
        (
            "Error initializing filter",
            "a filter rejected its options, check crop/scale/speed values",
        ),
    ];

    PATTERNS
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, suggestion)| *suggestion)
}

/// A pipeline stage (FFmpeg, tee, ...) that exited unsuccessfully.
#[derive(Debug, Clone)]
pub struct FfmpegError {
    /// Program name
    pub tool: String,
    /// Shell-escaped command line
    pub command: String,
    /// `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub suggestion: Option<&'static str>,
}

impl FfmpegError {
    pub fn new(tool: String, command: String, exit_code: Option<i32>, stderr: String) -> Self {
        let suggestion = get_error_suggestion(&stderr);
        Self {
            tool,
            command,
            exit_code,
            stderr,
            suggestion,
        }
    }
}

impl fmt::Display for FfmpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} failed (exit code {})", self.tool, code)?,
            None => write!(f, "{} was terminated by a signal", self.tool)?,
        }
        if !self.stderr.trim().is_empty() {
            write!(f, ": {}", format_ffmpeg_error(&self.stderr))?;
        }
        write!(f, "\n   Command: {}", self.command)?;
        if let Some(suggestion) = self.suggestion {
            write!(f, "\n   💡 Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for FfmpegError {}
