/// yt-dlp subprocess adapter.
///
/// Every call spawns `yt-dlp` as a child process. Stdout carries the result
/// (JSON for metadata, the final file path for downloads); stderr is
/// forwarded to tracing logs and kept for error messages.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mediagrab_shared::errors::{MediaError, MediaResult};
use mediagrab_shared::models::{
    DownloadRecord, DownloadRequest, VideoInfo, DEFAULT_FORMAT, OUTPUT_CONTAINER,
};

use crate::backend::MediaBackend;
use crate::formats::{shape_info, RawInfo};
use crate::tools;

/// Selector used when the caller asks for "best".
pub const BEST_SELECTOR: &str = "bestvideo+bestaudio/best";

/// Stderr lines kept for error reporting.
const STDERR_TAIL: usize = 20;

/// Settings for the yt-dlp adapter.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// yt-dlp executable name or path.
    pub bin: String,
    /// Flat directory downloads are written to.
    pub download_dir: PathBuf,
    /// Explicit ffmpeg binary or directory.
    pub ffmpeg_location: Option<String>,
    pub info_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            bin: "yt-dlp".to_string(),
            download_dir: PathBuf::from("./downloads"),
            ffmpeg_location: None,
            info_timeout: Duration::from_secs(120),
            download_timeout: Duration::from_secs(3600),
        }
    }
}

/// Map the caller's format choice to a yt-dlp selector.
pub fn format_selector(format_id: &str) -> &str {
    if format_id == DEFAULT_FORMAT {
        BEST_SELECTOR
    } else {
        format_id
    }
}

/// Whether the download must be converted to mp4 with ffmpeg.
/// "best" is merged straight into mp4 and audio selections are left alone.
pub fn needs_conversion(format_id: &str) -> bool {
    format_id != DEFAULT_FORMAT && !format_id.contains("audio")
}

/// `ERROR:` lines from yt-dlp stderr, or the tail when there are none.
pub fn summarize_stderr(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR"))
        .collect();

    if errors.is_empty() {
        stderr.trim().to_string()
    } else {
        errors.join("\n")
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("killpg({}) failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Find the file a download produced.
///
/// `printed` is yt-dlp's `after_move:filepath` output. When that file is
/// missing, `<id>.mp4` in `dir` is checked once before giving up.
pub async fn resolve_output(printed: &str, dir: &Path, id: &str) -> MediaResult<PathBuf> {
    let fallback = dir.join(format!("{}.{}", id, OUTPUT_CONTAINER));

    if let Some(line) = printed.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
        let candidate = PathBuf::from(line);
        if is_file(&candidate).await {
            return Ok(candidate);
        }
        debug!("Reported path {:?} missing, trying {:?}", candidate, fallback);
    }

    if is_file(&fallback).await {
        return Ok(fallback);
    }

    Err(MediaError::FileNotFound)
}

/// yt-dlp backed implementation of [`MediaBackend`].
pub struct YtDlp {
    config: YtDlpConfig,
    /// PATH handed to the child so yt-dlp can find ffmpeg.
    path_env: String,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        let path_env = tools::augmented_path(config.ffmpeg_location.as_deref());
        Self { config, path_env }
    }

    /// Arguments for a metadata-only extraction.
    pub fn info_args(url: &str) -> Vec<String> {
        [
            "--dump-single-json",
            "--no-warnings",
            "--no-check-certificates",
            "--skip-download",
            "--",
            url,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Arguments for downloading `request` under the given id.
    pub fn download_args(&self, id: &str, request: &DownloadRequest) -> Vec<String> {
        let template = self.config.download_dir.join(format!("{}.%(ext)s", id));

        let mut args: Vec<String> = vec![
            "--format".into(),
            format_selector(&request.format_id).into(),
            "--output".into(),
            template.display().to_string(),
            "--merge-output-format".into(),
            OUTPUT_CONTAINER.into(),
            "--no-check-certificates".into(),
            "--geo-bypass".into(),
            "--no-progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
        ];

        if needs_conversion(&request.format_id) {
            args.push("--recode-video".into());
            args.push(OUTPUT_CONTAINER.into());
        }

        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.clone());
        }

        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    /// Run yt-dlp and return its stdout.
    async fn run(&self, args: &[String], timeout: Duration) -> MediaResult<Vec<u8>> {
        let mut cmd = Command::new(&self.config.bin);
        cmd.args(args)
            .env("PATH", &self.path_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // yt-dlp starts ffmpeg as its own child; give the whole tree one group
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| MediaError::Spawn {
            bin: self.config.bin.clone(),
            message: e.to_string(),
        })?;

        let pid = child.id();
        debug!("yt-dlp spawned (pid: {:?})", pid);

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::InvalidOutput("No stderr handle".into()))?;

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "yt_dlp", "{}", line);
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail.join("\n")
        });

        // Dropping the child on timeout kills yt-dlp itself, the group kill
        // takes down anything it spawned.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("yt-dlp timed out after {}s, killing", timeout.as_secs());
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                return Err(MediaError::Timeout(timeout.as_secs()));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();

        if !output.status.success() {
            return Err(MediaError::Process {
                status: output.status.to_string(),
                stderr: summarize_stderr(&stderr),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaBackend for YtDlp {
    async fn fetch_info(&self, url: &str) -> MediaResult<VideoInfo> {
        let stdout = self.run(&Self::info_args(url), self.config.info_timeout).await?;

        let raw: RawInfo = serde_json::from_slice(&stdout)?;
        let info = shape_info(raw);

        info!("Fetched info for {}: {} formats", url, info.formats.len());
        Ok(info)
    }

    async fn download(&self, request: &DownloadRequest) -> MediaResult<DownloadRecord> {
        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        let id = Uuid::new_v4().to_string();
        let args = self.download_args(&id, request);

        info!(
            "Downloading {} with format: {} (id={})",
            request.url, request.format_id, id
        );

        let stdout = self.run(&args, self.config.download_timeout).await?;
        let printed = String::from_utf8_lossy(&stdout);
        let path = resolve_output(&printed, &self.config.download_dir, &id).await?;

        info!("Download successful: {}", path.display());
        Ok(DownloadRecord::from_path(&id, &path, request))
    }

    async fn version(&self) -> Option<String> {
        tools::ytdlp_version(&self.config.bin).await
    }
}
