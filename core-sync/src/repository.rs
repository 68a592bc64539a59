//! # Sync Job Repository
//!
//! Persists the history of sync passes, one row per pass and server.

use crate::{Result, SyncError, SyncJob, SyncJobId, SyncJobStats, SyncStatus};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for sync job persistence
#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    /// Insert a new sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn insert(&self, job: &SyncJob) -> Result<()>;

    /// Update an existing sync job
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobNotFound`] if the job doesn't exist
    async fn update(&self, job: &SyncJob) -> Result<()>;

    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>>;

    /// Most recent sync job for a server
    async fn find_latest_by_server(&self, server_id: &str) -> Result<Option<SyncJob>>;

    /// Sync job history for a server, most recent first
    async fn get_history(&self, server_id: &str, limit: u32) -> Result<Vec<SyncJob>>;

    /// Whether a pending or running job exists for the server
    async fn has_active_sync(&self, server_id: &str) -> Result<bool>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of SyncJobRepository
pub struct SqliteSyncJobRepository {
    pool: SqlitePool,
}

impl SqliteSyncJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SyncJobRow {
    id: String,
    server_id: String,
    status: String,
    full_sync: bool,
    items_seen: i64,
    items_created: i64,
    items_updated: i64,
    items_failed: i64,
    items_unavailable: i64,
    error_message: Option<String>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<SyncJobRow> for SyncJob {
    type Error = SyncError;

    fn try_from(row: SyncJobRow) -> Result<Self> {
        let status: SyncStatus = row.status.parse()?;

        let stats = (status == SyncStatus::Completed).then(|| SyncJobStats {
            items_seen: row.items_seen.max(0) as u64,
            items_created: row.items_created.max(0) as u64,
            items_updated: row.items_updated.max(0) as u64,
            items_failed: row.items_failed.max(0) as u64,
            items_unavailable: row.items_unavailable.max(0) as u64,
        });

        Ok(SyncJob {
            id: SyncJobId::from_string(&row.id)?,
            server_id: row.server_id,
            status,
            full_sync: row.full_sync,
            stats,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, server_id, status, full_sync,
           items_seen, items_created, items_updated, items_failed, items_unavailable,
           error_message, started_at, completed_at, created_at
    FROM sync_jobs
"#;

#[async_trait]
impl SyncJobRepository for SqliteSyncJobRepository {
    async fn insert(&self, job: &SyncJob) -> Result<()> {
        let stats = job.stats.unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO sync_jobs (
                id, server_id, status, full_sync,
                items_seen, items_created, items_updated, items_failed, items_unavailable,
                error_message, started_at, completed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(&job.server_id)
        .bind(job.status.as_str())
        .bind(job.full_sync)
        .bind(stats.items_seen as i64)
        .bind(stats.items_created as i64)
        .bind(stats.items_updated as i64)
        .bind(stats.items_failed as i64)
        .bind(stats.items_unavailable as i64)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, job: &SyncJob) -> Result<()> {
        let stats = job.stats.unwrap_or_default();

        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                status = ?,
                items_seen = ?,
                items_created = ?,
                items_updated = ?,
                items_failed = ?,
                items_unavailable = ?,
                error_message = ?,
                started_at = ?,
                completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(stats.items_seen as i64)
        .bind(stats.items_created as i64)
        .bind(stats.items_updated as i64)
        .bind(stats.items_failed as i64)
        .bind(stats.items_unavailable as i64)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: job.id.to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query_as::<_, SyncJobRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(SyncJob::try_from).transpose()
    }

    async fn find_latest_by_server(&self, server_id: &str) -> Result<Option<SyncJob>> {
        let sql = format!("{SELECT_COLUMNS} WHERE server_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1");
        let row = sqlx::query_as::<_, SyncJobRow>(&sql)
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SyncJob::try_from).transpose()
    }

    async fn get_history(&self, server_id: &str, limit: u32) -> Result<Vec<SyncJob>> {
        let sql = format!("{SELECT_COLUMNS} WHERE server_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?");
        let rows = sqlx::query_as::<_, SyncJobRow>(&sql)
            .bind(server_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(SyncJob::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn has_active_sync(&self, server_id: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM sync_jobs
            WHERE server_id = ? AND status IN ('pending', 'running')
            "#,
        )
        .bind(server_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::create_test_pool;

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSyncJobRepository::new(pool);

        let job = SyncJob::new("server-1", true);
        repo.insert(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found, job);
    }

    #[tokio::test]
    async fn test_complete_job_with_stats() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSyncJobRepository::new(pool);

        let job = SyncJob::new("server-1", false).start().unwrap();
        repo.insert(&job).await.unwrap();
        assert!(repo.has_active_sync("server-1").await.unwrap());

        let stats = SyncJobStats {
            items_seen: 5,
            items_created: 2,
            items_updated: 2,
            items_failed: 1,
            items_unavailable: 0,
        };
        let job = job.complete(stats).unwrap();
        repo.update(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, SyncStatus::Completed);
        assert_eq!(found.stats, Some(stats));
        assert!(!repo.has_active_sync("server-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_job() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSyncJobRepository::new(pool);

        let result = repo.update(&SyncJob::new("server-1", true)).await;
        assert!(matches!(result, Err(SyncError::JobNotFound { .. })));
    }

    #[tokio::test]
    async fn test_history_is_per_server_and_most_recent_first() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSyncJobRepository::new(pool);

        let mut ids = Vec::new();
        for created_at in [100, 200, 300] {
            let mut job = SyncJob::new("server-1", true);
            job.created_at = created_at;
            repo.insert(&job).await.unwrap();
            ids.push(job.id);
        }
        repo.insert(&SyncJob::new("server-2", true)).await.unwrap();

        let history = repo.get_history("server-1", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, ids[2]);
        assert_eq!(history[1].id, ids[1]);

        let latest = repo.find_latest_by_server("server-1").await.unwrap().unwrap();
        assert_eq!(latest.id, ids[2]);
        assert!(repo.find_latest_by_server("server-3").await.unwrap().is_none());
    }
}
