/// Retention sweeper for downloaded files.
///
/// Downloads are kept forever unless a retention window is configured. With
/// one set, a background task periodically removes registry entries older
/// than the window together with their files.
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use mediagrab_shared::db;
use mediagrab_shared::errors::MediaResult;

/// Delete every download older than `retention`. Returns how many were removed.
pub async fn sweep_expired(pool: &SqlitePool, retention: Duration) -> MediaResult<usize> {
    let window = chrono::Duration::from_std(retention)
        .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
    let cutoff = Utc::now()
        .naive_utc()
        .checked_sub_signed(window)
        .unwrap_or(chrono::NaiveDateTime::MIN);

    let expired = db::list_expired(pool, cutoff).await?;
    let mut removed = 0;

    for record in &expired {
        match tokio::fs::remove_file(&record.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // Keep the entry so the next sweep retries
                warn!("Failed to delete expired file {}: {}", record.path, e);
                continue;
            }
        }
        if db::delete_download(pool, &record.id).await? {
            removed += 1;
        }
    }

    Ok(removed)
}

/// Run [`sweep_expired`] every `interval` for the lifetime of the process.
pub fn spawn_sweeper(pool: SqlitePool, retention: Duration, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep_expired(&pool, retention).await {
                Ok(n) if n > 0 => info!("Removed {} expired downloads", n),
                Err(e) => warn!("Retention sweep error: {}", e),
                _ => {}
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagrab_shared::models::{DownloadRecord, DownloadRequest};

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("r.db").display());
        let pool = db::create_pool(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let request = DownloadRequest::new("https://x/v", None);

        let old_path = dir.path().join("old.mp4");
        std::fs::write(&old_path, b"old").unwrap();
        let mut old = DownloadRecord::from_path("old", &old_path, &request);
        old.created_at = (Utc::now() - chrono::Duration::hours(3)).naive_utc();
        db::insert_download(&pool, &old).await.unwrap();

        let new_path = dir.path().join("new.mp4");
        std::fs::write(&new_path, b"new").unwrap();
        let new = DownloadRecord::from_path("new", &new_path, &request);
        db::insert_download(&pool, &new).await.unwrap();

        // Registered but already gone from disk
        let mut gone = DownloadRecord::from_path("gone", &dir.path().join("gone.mp4"), &request);
        gone.created_at = old.created_at;
        db::insert_download(&pool, &gone).await.unwrap();

        let removed = sweep_expired(&pool, Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 2);
        assert!(!old_path.exists());
        assert!(new_path.exists());
        assert!(db::get_download(&pool, "new").await.unwrap().is_some());
        assert!(db::get_download(&pool, "old").await.unwrap().is_none());
    }
}
