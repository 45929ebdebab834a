//! Preview playback
//!
//! Two ways to look at the result:
//! - after the batch, one player run over every produced GIF
//! - streamed, for a single input: `ffmpeg … - | tee out.gif | mpv -`,
//!   so playback starts while the GIF is still being encoded
//!
//! In the streamed pipeline every pipe end is handed to exactly one child.
//! The parent keeps no copy (the configured `Command`s are dropped right
//! after spawning), otherwise a stage never sees end-of-stream or never
//! gets EPIPE when its reader goes away.

use shared_utils::common_utils::command_line;
use shared_utils::errors::{GifError, Result};
use shared_utils::ffmpeg_process::FfmpegProcess;
use shared_utils::tools::ExternalTools;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// `mpv --loop-file --hr-seek=yes -- <files>`
pub fn play_command<S: AsRef<OsStr>>(tools: &ExternalTools, files: &[S]) -> Command {
    let mut cmd = Command::new(&tools.player);
    cmd.arg("--loop-file").arg("--hr-seek=yes").arg("--");
    cmd.args(files);
    cmd
}

/// `tee --output-error=warn-nopipe -- <output>`: keeps writing the file
/// after the player is closed.
pub fn tee_command(tools: &ExternalTools, output: &Path) -> Command {
    let mut cmd = Command::new(&tools.tee);
    cmd.arg("--output-error=warn-nopipe").arg("--").arg(output);
    cmd
}

/// Play finished files. Any failure, including a non-zero player exit,
/// is a [`GifError::Playback`].
pub fn play_files<S: AsRef<OsStr>>(tools: &ExternalTools, files: &[S]) -> Result<()> {
    let mut cmd = play_command(tools, files);
    let line = command_line(&cmd);
    debug!("Running: {}", line);

    let status = cmd
        .status()
        .map_err(|e| GifError::Playback(format!("{}: {}", line, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(GifError::Playback(format!("{} ({})", line, status)))
    }
}

/// Run encoder → tee → player. `encoder_args` must target stdout (`-`).
///
/// Returns the encoder's stderr. The player's exit status is ignored (the
/// user closing it early is normal); encoder and tee failures are errors.
/// All started processes are waited on before returning.
pub fn run_play_pipeline(
    tools: &ExternalTools,
    encoder_args: &[OsString],
    output: &Path,
) -> Result<String> {
    let mut encoder_cmd = Command::new(&tools.ffmpeg);
    encoder_cmd.args(encoder_args).stdout(Stdio::piped());
    let mut tee_cmd = tee_command(tools, output);
    tee_cmd.stdout(Stdio::piped());
    let mut play_cmd = play_command(tools, &["-"]);

    debug!(
        "Running: {} | {} | {}",
        command_line(&encoder_cmd),
        command_line(&tee_cmd),
        command_line(&play_cmd)
    );

    let mut encoder = FfmpegProcess::spawn(&mut encoder_cmd)?;
    drop(encoder_cmd);
    let encoder_out = encoder
        .take_stdout()
        .ok_or_else(|| io::Error::other("encoder stdout was not captured"))?;

    let spawned_tee = FfmpegProcess::spawn_with_stdin(&mut tee_cmd, Stdio::from(encoder_out));
    drop(tee_cmd);
    let mut tee = match spawned_tee {
        Ok(tee) => tee,
        Err(e) => {
            // its stdout has no reader any more: EPIPE ends it
            let _ = encoder.kill();
            let _ = encoder.wait_with_output();
            return Err(e);
        }
    };

    let player = match tee.take_stdout() {
        Some(tee_out) => {
            play_cmd.stdin(Stdio::from(tee_out));
            let spawned = play_cmd.spawn();
            drop(play_cmd);
            match spawned {
                Ok(child) => Some(child),
                Err(e) => {
                    warn!("⚠️  Could not start player {}: {}", tools.player.display(), e);
                    None
                }
            }
        }
        None => None,
    };

    let encoder_result = encoder.wait_checked();
    let tee_result = tee.wait_checked();
    if let Some(player) = player {
        wait_player(player, tools);
    }

    let stderr = encoder_result?;
    let tee_stderr = tee_result?;
    if !tee_stderr.trim().is_empty() {
        debug!("tee: {}", tee_stderr.trim());
    }
    Ok(stderr)
}

fn wait_player(mut player: Child, tools: &ExternalTools) {
    match player.wait() {
        Ok(status) if !status.success() => {
            debug!("{} exited with {}, ignored", tools.player.display(), status)
        }
        Ok(_) => {}
        Err(e) => warn!("⚠️  Failed to wait for {}: {}", tools.player.display(), e),
    }
}
