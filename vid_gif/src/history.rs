//! Command history
//!
//! `~/.vid-gif.log` collects the command lines of successful runs, one per
//! line, shell-escaped so they can be pasted back. Opt-in: the file is only
//! appended to when it already exists (`touch ~/.vid-gif.log` to enable).

use shared_utils::common_utils::shell_escape;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE_NAME: &str = ".vid-gif.log";

pub fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
}

/// Append `argv` as one line. `Ok(false)` when history is not enabled.
pub fn append_history<I, S>(path: &Path, argv: I) -> io::Result<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut file = match OpenOptions::new().append(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    writeln!(file, "{}", shell_escape(argv))?;
    Ok(true)
}
