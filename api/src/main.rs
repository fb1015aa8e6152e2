/// Mediagrab API Server
///
/// Fetches media metadata, runs downloads through yt-dlp, and serves the
/// resulting files.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use mediagrab_api::config::Config;
use mediagrab_api::{app, retention, AppState};
use mediagrab_downloader::{MediaBackend, YtDlp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mediagrab_api=info,mediagrab_downloader=info,mediagrab_shared=info,tower_http=info"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env();

    // Download directory must exist before the first request
    std::fs::create_dir_all(&config.download_dir).with_context(|| {
        format!("creating download directory {}", config.download_dir.display())
    })?;
    info!("Download directory: {}", config.download_dir.display());

    // Registry
    let database_url = config.database_url();
    let pool = mediagrab_shared::db::create_pool(&database_url).await?;
    mediagrab_shared::db::run_migrations(&pool).await?;

    let backend = YtDlp::new(config.ytdlp());
    match backend.version().await {
        Some(v) => info!("Using {} {}", config.ytdlp_bin, v),
        None => tracing::warn!(
            "{} not runnable; requests will fail until it is installed",
            config.ytdlp_bin
        ),
    }

    match config.retention() {
        Some(window) => {
            info!("Retention: removing downloads older than {}s", window.as_secs());
            retention::spawn_sweeper(
                pool.clone(),
                window,
                Duration::from_secs(config.cleanup_interval_secs.max(1)),
            );
        }
        None => info!("Retention: downloads are kept until removed externally"),
    }

    let state = Arc::new(AppState {
        pool,
        backend: Arc::new(backend),
        static_dir: config.static_dir.clone(),
    });

    // Bind
    let addr = format!("{}:{}", config.host, config.port);
    info!("Mediagrab API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
