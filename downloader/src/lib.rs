//! Mediagrab downloader
//!
//! Adapters over the `yt-dlp` binary: metadata extraction, downloads with
//! optional ffmpeg conversion, and output path resolution.

pub mod backend;
pub mod formats;
pub mod tools;
pub mod ytdlp;

pub use backend::MediaBackend;
pub use ytdlp::{YtDlp, YtDlpConfig};
