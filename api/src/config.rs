/// Environment-driven configuration for the API server.
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mediagrab_downloader::YtDlpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub download_dir: PathBuf,
    pub database_path: PathBuf,
    pub static_dir: PathBuf,
    pub ytdlp_bin: String,
    pub ffmpeg_path: Option<String>,
    pub info_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// 0 keeps downloads forever.
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            download_dir: PathBuf::from("./downloads"),
            database_path: PathBuf::from("./mediagrab.db"),
            static_dir: PathBuf::from("./static"),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_path: None,
            info_timeout_secs: 120,
            download_timeout_secs: 3600,
            retention_secs: 0,
            cleanup_interval_secs: 300,
        }
    }
}

/// Parse `raw`, falling back to `default` when absent or malformed.
fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: var("API_HOST").unwrap_or(d.host),
            port: parse_or(var("API_PORT"), d.port),
            download_dir: var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(d.download_dir),
            database_path: var("DATABASE_PATH").map(PathBuf::from).unwrap_or(d.database_path),
            static_dir: var("STATIC_DIR").map(PathBuf::from).unwrap_or(d.static_dir),
            ytdlp_bin: var("YTDLP_BIN").unwrap_or(d.ytdlp_bin),
            ffmpeg_path: var("FFMPEG_PATH"),
            info_timeout_secs: parse_or(var("INFO_TIMEOUT_SECS"), d.info_timeout_secs),
            download_timeout_secs: parse_or(var("DOWNLOAD_TIMEOUT_SECS"), d.download_timeout_secs),
            retention_secs: parse_or(var("RETENTION_SECS"), d.retention_secs),
            cleanup_interval_secs: parse_or(var("CLEANUP_INTERVAL_SECS"), d.cleanup_interval_secs),
        }
    }

    /// SQLite URL for the registry database.
    pub fn database_url(&self) -> String {
        let path = self
            .database_path
            .canonicalize()
            .unwrap_or_else(|_| self.database_path.clone());
        // Strip Windows UNC prefix (\\?\) which breaks SQLite URL parsing
        let path = path.display().to_string();
        let path = path.strip_prefix(r"\\?\").unwrap_or(&path);
        format!("sqlite://{}?mode=rwc", path)
    }

    pub fn ytdlp(&self) -> YtDlpConfig {
        YtDlpConfig {
            bin: self.ytdlp_bin.clone(),
            download_dir: self.download_dir.clone(),
            ffmpeg_location: self.ffmpeg_path.clone(),
            info_timeout: Duration::from_secs(self.info_timeout_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }

    pub fn retention(&self) -> Option<Duration> {
        (self.retention_secs > 0).then(|| Duration::from_secs(self.retention_secs))
    }
}
