//! Common Utilities Module
//!
//! Small helpers shared by the conversion pipeline:
//! - file name checks
//! - display names for paths
//! - option-safe path arguments
//! - shell-escaped command lines (for logs and the history file only)

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

// ═══════════════════════════════════════════════════════════════
// File Operations
// ═══════════════════════════════════════════════════════════════

/// Case-insensitive check of the file name's ending, e.g. `".gif"`.
///
/// Unlike an extension check this also matches a bare `.gif`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::file_name_ends_with;
///
/// assert!(file_name_ends_with(Path::new("anim.GIF"), ".gif"));
/// assert!(!file_name_ends_with(Path::new("clip.mp4"), ".gif"));
/// ```
pub fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| {
            name.to_string_lossy()
                .to_lowercase()
                .ends_with(&suffix.to_lowercase())
        })
        .unwrap_or(false)
}

/// Final path component for log messages, falling back to the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Path as a command argument that can never be mistaken for an option.
///
/// Relative paths starting with `-` get a `./` prefix.
pub fn safe_path_arg(path: &Path) -> Cow<'_, Path> {
    if path.as_os_str().to_string_lossy().starts_with('-') {
        Cow::Owned(Path::new(".").join(path))
    } else {
        Cow::Borrowed(path)
    }
}

// ═══════════════════════════════════════════════════════════════
// Command Lines
// ═══════════════════════════════════════════════════════════════

/// Quote a single argument the way a POSIX shell would need it.
///
/// Arguments that cannot be quoted (embedded NUL) are rendered lossy,
/// this is only ever used for display.
pub fn shell_quote(arg: &str) -> String {
    match shlex::try_quote(arg) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => format!("{:?}", arg),
    }
}

/// Escape a full argument list into one shell line.
///
/// # Examples
/// ```
/// use shared_utils::common_utils::shell_escape;
///
/// let line = shell_escape(["ffmpeg", "-i", "my clip.mov"]);
/// assert!(line.starts_with("ffmpeg -i "));
/// assert_ne!(line, "ffmpeg -i my clip.mov");
/// ```
pub fn shell_escape<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter()
        .map(|a| shell_quote(&a.as_ref().to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shell-escaped rendering of a configured [`Command`] (program + args).
pub fn command_line(cmd: &Command) -> String {
    shell_escape(std::iter::once(cmd.get_program()).chain(cmd.get_args()))
}
