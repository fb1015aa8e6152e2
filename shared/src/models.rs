/// Data models shared across all Mediagrab crates.
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::Path;

/// Format selector handed to the extractor when the caller does not pick one.
pub const DEFAULT_FORMAT: &str = "best";

/// Container every merged or converted download ends up in.
pub const OUTPUT_CONTAINER: &str = "mp4";

/// One selectable audio/video stream combination offered by the source site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    /// Human label from the extractor (`format_note`).
    pub quality: String,
    pub filesize: Option<u64>,
    pub vcodec: String,
    pub acodec: String,
    pub resolution: String,
    pub fps: Option<f64>,
    /// Total bitrate in KBit/s.
    pub tbr: Option<f64>,
}

/// Metadata returned by `/get_video_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub formats: Vec<FormatDescriptor>,
}

/// A download the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format_id: Option<String>) -> Self {
        let format_id = format_id
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        Self {
            url: url.into(),
            format_id,
        }
    }
}

/// Completed download, as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DownloadRecord {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub ext: String,
    pub url: String,
    pub format_id: String,
    pub created_at: NaiveDateTime,
}

impl DownloadRecord {
    /// Build a record for a file the extractor has confirmed on disk.
    pub fn from_path(id: &str, path: &Path, request: &DownloadRequest) -> Self {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_else(|| format!("{}.{}", id, OUTPUT_CONTAINER));
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(OUTPUT_CONTAINER)
            .to_string();

        Self {
            id: id.to_string(),
            filename,
            path: path.display().to_string(),
            ext,
            url: request.url.clone(),
            format_id: request.format_id.clone(),
            created_at: Utc::now().naive_utc(),
        }
    }
}
