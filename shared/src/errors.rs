/// Unified error types for Mediagrab.
use thiserror::Error;

/// Errors raised while talking to the extractor or touching downloaded files.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to spawn {bin}: {message}")]
    Spawn { bin: String, message: String },

    #[error("yt-dlp failed ({status}): {stderr}")]
    Process { status: String, stderr: String },

    #[error("yt-dlp timed out after {0}s")]
    Timeout(u64),

    #[error("yt-dlp returned unexpected output: {0}")]
    InvalidOutput(String),

    #[error("Downloaded file not found")]
    FileNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type alias for Mediagrab operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_embeds_stderr() {
        let err = MediaError::Process {
            status: "exit status: 1".into(),
            stderr: "ERROR: Unsupported URL".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("Unsupported URL"));
    }

    #[test]
    fn test_file_not_found_message() {
        assert_eq!(MediaError::FileNotFound.to_string(), "Downloaded file not found");
    }
}
