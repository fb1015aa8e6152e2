/// Discovery of the external tools yt-dlp relies on.
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

#[cfg(windows)]
const PATH_SEP: &str = ";";
#[cfg(not(windows))]
const PATH_SEP: &str = ":";

#[cfg(windows)]
const FFMPEG_EXE: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_EXE: &str = "ffmpeg";

/// Directories that hold an ffmpeg binary, explicit location first.
fn discover_ffmpeg_dirs(explicit: Option<&str>) -> Vec<String> {
    let mut dirs = Vec::new();

    if let Some(location) = explicit {
        let p = PathBuf::from(location);
        // --ffmpeg-location accepts either the binary or its directory
        let dir = if p.is_file() {
            p.parent().map(|d| d.to_string_lossy().to_string())
        } else {
            Some(location.to_string())
        };
        if let Some(dir) = dir.filter(|d| !d.is_empty()) {
            dirs.push(dir);
        }
    }

    let common: &[&str] = if cfg!(target_os = "windows") {
        &[r"C:\ffmpeg\bin", r"C:\Program Files\ffmpeg\bin"]
    } else {
        &[
            "/usr/bin",
            "/usr/local/bin",
            "/snap/bin",
            "/opt/homebrew/bin",
            "/home/linuxbrew/.linuxbrew/bin",
        ]
    };

    for path in common {
        if PathBuf::from(path).join(FFMPEG_EXE).exists() && !dirs.iter().any(|d| d == path) {
            dirs.push(path.to_string());
        }
    }

    dirs
}

/// `PATH` for the yt-dlp child, with ffmpeg locations appended.
pub fn augmented_path(ffmpeg_location: Option<&str>) -> String {
    join_path(
        &std::env::var("PATH").unwrap_or_default(),
        &discover_ffmpeg_dirs(ffmpeg_location),
    )
}

fn join_path(current: &str, extra: &[String]) -> String {
    if extra.is_empty() {
        return current.to_string();
    }
    let extras = extra.join(PATH_SEP);
    debug!("Adding to yt-dlp PATH: {}", extras);
    if current.is_empty() {
        extras
    } else {
        format!("{}{}{}", current, PATH_SEP, extras)
    }
}

/// Ask the extractor binary for its version. `None` when it cannot be run.
pub async fn ytdlp_version(bin: &str) -> Option<String> {
    let output = tokio::time::timeout(
        Duration::from_secs(10),
        Command::new(bin).arg("--version").kill_on_drop(true).output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        None
    } else {
        info!("Detected {} {}", bin, version);
        Some(version)
    }
}
