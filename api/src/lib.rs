//! Mediagrab API
//!
//! HTTP front end over yt-dlp: fetch media metadata, start downloads, and
//! serve the downloaded files back.

pub mod config;
pub mod retention;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::sqlite::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use mediagrab_downloader::MediaBackend;

/// Shared application state for all API handlers.
pub struct AppState {
    pub pool: SqlitePool,
    pub backend: Arc<dyn MediaBackend>,
    pub static_dir: PathBuf,
}

/// Build the router with all routes and layers.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let index = ServeFile::new(state.static_dir.join("index.html"));

    Router::new()
        .route_service("/", index)
        .route("/health", get(routes::health))
        .route("/get_video_info", post(routes::get_video_info))
        .route("/download", post(routes::download))
        .route("/download_file/:filename", get(routes::download_file))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
