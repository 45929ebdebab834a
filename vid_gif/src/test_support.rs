//! Fake external tools for runner and playback tests.

use shared_utils::tools::ExternalTools;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

const ETXTBSY: i32 = 26;

/// Write an executable `sh` script. `body` runs with the tool's arguments.
///
/// Another test thread forking while the file is still open for writing
/// makes exec fail with ETXTBSY for a moment, so the script is probed until
/// it runs.
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let text = format!("#!/bin/sh\n[ \"$1\" = __probe ] && exit 0\n{}\n", body);
    fs::write(&path, text).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    for _ in 0..100 {
        match Command::new(&path).arg("__probe").status() {
            Ok(_) => return path,
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                thread::sleep(Duration::from_millis(10))
            }
            Err(e) => panic!("cannot run {}: {}", path.display(), e),
        }
    }
    panic!("{} stayed busy", path.display());
}

/// Encoder that writes `content` to its last argument, or to stdout for `-`.
pub fn fake_encoder(dir: &Path, content: &str) -> PathBuf {
    script(
        dir,
        "fake-ffmpeg",
        &format!(
            "for last; do :; done\n\
             if [ \"$last\" = - ]; then printf '%s' '{0}'; else printf '%s' '{0}' > \"$last\"; fi",
            content
        ),
    )
}

/// Encoder that records that it ran, then fails.
pub fn failing_encoder(dir: &Path) -> PathBuf {
    let marker = dir.join("encoder-ran");
    script(
        dir,
        "failing-ffmpeg",
        &format!(
            "touch '{}'\necho 'Invalid data found when processing input' >&2\nexit 1",
            marker.display()
        ),
    )
}

pub fn tools(ffmpeg: PathBuf) -> ExternalTools {
    ExternalTools {
        ffmpeg,
        ..ExternalTools::default()
    }
}

pub fn missing_tool(dir: &Path) -> PathBuf {
    dir.join("not-installed")
}

pub fn read(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}
