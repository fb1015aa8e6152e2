/// Download registry: maps a download id to its confirmed file on disk.
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::errors::MediaResult;
use crate::models::DownloadRecord;

/// Create SQLite connection pool with WAL mode and busy timeout.
pub async fn create_pool(database_url: &str) -> MediaResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Connected to registry: {}", database_url);
    Ok(pool)
}

/// Run migrations from the migrations directory.
pub async fn run_migrations(pool: &SqlitePool) -> MediaResult<()> {
    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Registry migrations completed");
    Ok(())
}

/// Record a completed download.
pub async fn insert_download(pool: &SqlitePool, record: &DownloadRecord) -> MediaResult<()> {
    sqlx::query(
        r#"
        INSERT INTO downloads (id, filename, path, ext, url, format_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.filename)
    .bind(&record.path)
    .bind(&record.ext)
    .bind(&record.url)
    .bind(&record.format_id)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a download by id.
pub async fn get_download(pool: &SqlitePool, id: &str) -> MediaResult<Option<DownloadRecord>> {
    let record = sqlx::query_as::<_, DownloadRecord>(
        r#"
        SELECT id, filename, path, ext, url, format_id, created_at
        FROM downloads WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Downloads created strictly before `cutoff`, oldest first.
pub async fn list_expired(
    pool: &SqlitePool,
    cutoff: NaiveDateTime,
) -> MediaResult<Vec<DownloadRecord>> {
    let records = sqlx::query_as::<_, DownloadRecord>(
        r#"
        SELECT id, filename, path, ext, url, format_id, created_at
        FROM downloads WHERE created_at < ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Remove a download from the registry. Returns whether a row was deleted.
pub async fn delete_download(pool: &SqlitePool, id: &str) -> MediaResult<bool> {
    let result = sqlx::query("DELETE FROM downloads WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DownloadRequest;
    use chrono::{Duration, Utc};
    use std::path::Path;

    async fn test_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("registry.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn record(id: &str) -> DownloadRecord {
        let request = DownloadRequest::new("https://example.com/watch", None);
        DownloadRecord::from_path(id, Path::new(&format!("downloads/{}.mp4", id)), &request)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let rec = record("d1");
        insert_download(&pool, &rec).await.unwrap();

        let found = get_download(&pool, "d1").await.unwrap().unwrap();
        assert_eq!(found.filename, "d1.mp4");
        assert_eq!(found.ext, "mp4");
        assert_eq!(found.format_id, "best");
        assert!(get_download(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        insert_download(&pool, &record("d1")).await.unwrap();
        assert!(insert_download(&pool, &record("d1")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_expired_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let mut old = record("old");
        old.created_at = (Utc::now() - Duration::hours(2)).naive_utc();
        insert_download(&pool, &old).await.unwrap();
        insert_download(&pool, &record("new")).await.unwrap();

        let cutoff = (Utc::now() - Duration::hours(1)).naive_utc();
        let expired = list_expired(&pool, cutoff).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "old");

        assert!(delete_download(&pool, "old").await.unwrap());
        assert!(!delete_download(&pool, "old").await.unwrap());
        assert!(list_expired(&pool, cutoff).await.unwrap().is_empty());
    }
}
