/// API route handlers for Mediagrab.
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mediagrab_shared::db;
use mediagrab_shared::models::{DownloadRequest, VideoInfo};

use crate::AppState;

// ====== REQUEST / RESPONSE TYPES ======

#[derive(Deserialize)]
pub struct InfoBody {
    pub url: Option<String>,
}

#[derive(Deserialize)]
pub struct DownloadBody {
    pub url: Option<String>,
    pub format_id: Option<String>,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub filename: String,
    pub download_id: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "File not found")
}

/// Unwrap a JSON body. An unreadable body cannot carry a URL either.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection);
        error(StatusCode::BAD_REQUEST, "URL is required")
    })
}

fn require_url(url: Option<String>) -> Result<String, ApiError> {
    url.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "URL is required"))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "m4a" | "aac" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "opus" | "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` for serving a file under the requested name.
/// Control characters, quotes and backslashes are replaced so the name
/// always fits in a quoted header parameter.
fn attachment_disposition(filename: &str) -> Result<HeaderValue, ApiError> {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_control() || c == '"' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid filename: {}", e)))
}

// ====== ROUTES ======

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let version = state.backend.version().await;
    Json(serde_json::json!({
        "status": "ok",
        "yt_dlp": version,
    }))
}

/// POST /get_video_info
pub async fn get_video_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InfoBody>, JsonRejection>,
) -> Result<Json<VideoInfo>, ApiError> {
    let url = require_url(parse_body(payload)?.url)?;

    match state.backend.fetch_info(&url).await {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            warn!("Error in get_video_info: url={} error={}", url, e);
            Err(error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch video info: {}", e),
            ))
        }
    }
}

/// POST /download - Download synchronously and register the resulting file
pub async fn download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadBody>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let body = parse_body(payload)?;
    let request = DownloadRequest::new(require_url(body.url)?, body.format_id);

    info!("Downloading with format: {}", request.format_id);

    let failed = |e: &dyn std::fmt::Display| {
        warn!("Error in download: url={} error={}", request.url, e);
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Download failed: {}", e),
        )
    };

    let record = state
        .backend
        .download(&request)
        .await
        .map_err(|e| failed(&e))?;

    db::insert_download(&state.pool, &record)
        .await
        .map_err(|e| failed(&e))?;

    info!("Download registered: id={} file={}", record.id, record.path);

    Ok(Json(DownloadResponse {
        success: true,
        filename: record.filename,
        download_id: record.id,
    }))
}

/// GET /download_file/:filename - Stream a registered download as an attachment
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // The file stem is the download id
    let id = std::path::Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(not_found)?;

    let record = db::get_download(&state.pool, &id.to_string())
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(not_found)?;

    let file = match tokio::fs::File::open(&record.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Registered file missing on disk: {}", record.path);
            return Err(not_found());
        }
        Err(e) => {
            return Err(error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Cannot open file: {}", e),
            ))
        }
    };

    let len = file
        .metadata()
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .len();

    let disposition = attachment_disposition(&filename)?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&record.filename)),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        body,
    ))
}
