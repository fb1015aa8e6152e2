use async_trait::async_trait;

use mediagrab_shared::errors::MediaResult;
use mediagrab_shared::models::{DownloadRecord, DownloadRequest, VideoInfo};

/// Seam between the HTTP layer and whatever extracts and downloads media.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Metadata and deduplicated formats for `url`, without downloading.
    async fn fetch_info(&self, url: &str) -> MediaResult<VideoInfo>;

    /// Download `request` and return the confirmed file. The record is not
    /// yet registered; that is the caller's job.
    async fn download(&self, request: &DownloadRequest) -> MediaResult<DownloadRecord>;

    /// Version string of the underlying tool, if it can be queried.
    async fn version(&self) -> Option<String>;
}
