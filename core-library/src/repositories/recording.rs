//! Recording repository trait and implementation
//!
//! Read side of the recording mirror plus the bulk availability sweep and the
//! aggregate statistics. The row-level functions at module level take a bare
//! connection; a sync pass runs them on its per-record transaction.

use crate::error::{LibraryError, Result};
use crate::models::{PlaybackFormatView, Recording};
use crate::repositories::playback::FORMAT_VIEW_SELECT;
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

/// Recording repository interface for data access operations
#[async_trait]
pub trait RecordingRepository: Send + Sync {
    /// Find a recording by its local ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Recording>>;

    /// Find a recording by the ID assigned by the recording server
    async fn find_by_record_id(&self, record_id: &str) -> Result<Option<Recording>>;

    /// Insert a new recording
    ///
    /// # Errors
    /// Returns error if:
    /// - A recording with the same `record_id` already exists
    /// - Recording validation fails
    /// - Database error occurs
    async fn insert(&self, recording: &Recording) -> Result<()>;

    /// Query recordings by published flag, newest start time first
    async fn query_published(
        &self,
        published: bool,
        page_request: PageRequest,
    ) -> Result<Page<Recording>>;

    /// Query the recordings of one server
    async fn query_by_server(
        &self,
        server_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Recording>>;

    /// Playback format of a recording whose type carries the default flag
    async fn default_playback_format(
        &self,
        recording_id: &str,
    ) -> Result<Option<PlaybackFormatView>>;

    /// Average playback length of default-format recordings, in seconds
    ///
    /// The minutes average is truncated to two decimals before the
    /// conversion. Returns `0.0` when there is nothing to average.
    async fn average_length_seconds(&self) -> Result<f64>;

    /// Average recording size in bytes, `0.0` when no recording has a size
    async fn average_size_bytes(&self) -> Result<f64>;

    /// Mark every available recording of `server_id` whose `record_id` is
    /// not in `seen` as unavailable
    ///
    /// An empty `seen` list retires every available recording of the server.
    /// Recordings of other servers are never touched. Retired rows get
    /// `updated_at` as their modification time.
    ///
    /// # Returns
    /// Number of recordings flipped to unavailable
    async fn mark_unavailable(
        &self,
        server_id: &str,
        seen: &[String],
        updated_at: i64,
    ) -> Result<u64>;

    /// Count total recordings
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of RecordingRepository
pub struct SqliteRecordingRepository {
    pool: SqlitePool,
}

impl SqliteRecordingRepository {
    /// Create a new SqliteRecordingRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Truncate a minutes average to two decimals and convert it to seconds
///
/// A value within float noise of a whole number of hundredths is taken as
/// that number, so `0.29` stays `0.29` even though `0.29 * 100.0` is below 29.
pub(crate) fn minutes_to_seconds_truncated(minutes: f64) -> f64 {
    let scaled = minutes * 100.0;
    let nearest = scaled.round();
    let hundredths = if (scaled - nearest).abs() < 1e-6 {
        nearest
    } else {
        scaled.trunc()
    };
    hundredths / 100.0 * 60.0
}

// Row-level operations shared with the sync engine.

pub async fn load_by_record_id(
    conn: &mut SqliteConnection,
    record_id: &str,
) -> Result<Option<Recording>> {
    let recording = query_as::<_, Recording>("SELECT * FROM recordings WHERE record_id = ?")
        .bind(record_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(recording)
}

/// Insert a recording row as is; callers validate first
pub async fn insert_recording(conn: &mut SqliteConnection, recording: &Recording) -> Result<()> {
    query(
        r#"
        INSERT INTO recordings (
            id, record_id, server_id, room_id, meeting_ref, meeting_id, name,
            description, published, available, start_time, end_time, size,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recording.id)
    .bind(&recording.record_id)
    .bind(&recording.server_id)
    .bind(&recording.room_id)
    .bind(&recording.meeting_ref)
    .bind(&recording.meeting_id)
    .bind(&recording.name)
    .bind(&recording.description)
    .bind(recording.published)
    .bind(recording.available)
    .bind(recording.start_time)
    .bind(recording.end_time)
    .bind(recording.size)
    .bind(recording.created_at)
    .bind(recording.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Write back the server-reported fields of an existing recording
///
/// `record_id`, `meeting_ref`, `description` and `created_at` are fixed at
/// creation and left alone.
pub async fn update_recording(conn: &mut SqliteConnection, recording: &Recording) -> Result<()> {
    let result = query(
        r#"
        UPDATE recordings
        SET server_id = ?, room_id = ?, meeting_id = ?, name = ?, published = ?,
            available = ?, start_time = ?, end_time = ?, size = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&recording.server_id)
    .bind(&recording.room_id)
    .bind(&recording.meeting_id)
    .bind(&recording.name)
    .bind(recording.published)
    .bind(recording.available)
    .bind(recording.start_time)
    .bind(recording.end_time)
    .bind(recording.size)
    .bind(recording.updated_at)
    .bind(&recording.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LibraryError::NotFound {
            entity_type: "Recording".to_string(),
            id: recording.id.clone(),
        });
    }
    Ok(())
}

#[async_trait]
impl RecordingRepository for SqliteRecordingRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Recording>> {
        let recording = query_as::<_, Recording>("SELECT * FROM recordings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(recording)
    }

    async fn find_by_record_id(&self, record_id: &str) -> Result<Option<Recording>> {
        let mut conn = self.pool.acquire().await?;
        load_by_record_id(&mut conn, record_id).await
    }

    async fn insert(&self, recording: &Recording) -> Result<()> {
        recording
            .validate()
            .map_err(|e| LibraryError::InvalidInput {
                field: "Recording".to_string(),
                message: e,
            })?;

        let mut conn = self.pool.acquire().await?;
        insert_recording(&mut conn, recording).await
    }

    async fn query_published(
        &self,
        published: bool,
        page_request: PageRequest,
    ) -> Result<Page<Recording>> {
        let total: i64 = query_as("SELECT COUNT(*) FROM recordings WHERE published = ?")
            .bind(published)
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        let recordings = query_as::<_, Recording>(
            r#"
            SELECT * FROM recordings
            WHERE published = ?
            ORDER BY start_time DESC, record_id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(published)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(recordings, total as u64, page_request))
    }

    async fn query_by_server(
        &self,
        server_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Recording>> {
        let total: i64 = query_as("SELECT COUNT(*) FROM recordings WHERE server_id = ?")
            .bind(server_id)
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        let recordings = query_as::<_, Recording>(
            r#"
            SELECT * FROM recordings
            WHERE server_id = ?
            ORDER BY start_time DESC, record_id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(server_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(recordings, total as u64, page_request))
    }

    async fn default_playback_format(
        &self,
        recording_id: &str,
    ) -> Result<Option<PlaybackFormatView>> {
        let sql = format!(
            "{} WHERE pf.recording_id = ? AND pt.is_default = 1 LIMIT 1",
            FORMAT_VIEW_SELECT
        );
        let format = query_as::<_, PlaybackFormatView>(&sql)
            .bind(recording_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(format)
    }

    #[instrument(skip(self))]
    async fn average_length_seconds(&self) -> Result<f64> {
        let (average,): (Option<f64>,) = query_as(
            r#"
            SELECT AVG(pf.length)
            FROM playback_formats pf
            JOIN playback_types pt ON pt.id = pf.playback_type_id
            WHERE pt.is_default = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let seconds = average.map(minutes_to_seconds_truncated).unwrap_or(0.0);
        debug!(minutes = ?average, seconds, "Computed average playback length");
        Ok(seconds)
    }

    #[instrument(skip(self))]
    async fn average_size_bytes(&self) -> Result<f64> {
        let (average,): (Option<f64>,) =
            query_as("SELECT AVG(CAST(size AS REAL)) FROM recordings WHERE size IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(average.unwrap_or(0.0))
    }

    #[instrument(skip(self, seen), fields(seen = seen.len()))]
    async fn mark_unavailable(
        &self,
        server_id: &str,
        seen: &[String],
        updated_at: i64,
    ) -> Result<u64> {
        // The seen set travels as one JSON array so its size is not bounded by
        // the bind parameter limit.
        let seen_json = serde_json::to_string(seen).map_err(|e| LibraryError::InvalidInput {
            field: "seen".to_string(),
            message: e.to_string(),
        })?;

        let result = query(
            r#"
            UPDATE recordings
            SET available = 0, updated_at = ?
            WHERE server_id = ?
              AND available = 1
              AND record_id NOT IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(updated_at)
        .bind(server_id)
        .bind(seen_json)
        .execute(&self.pool)
        .await?;

        debug!(
            server_id,
            marked = result.rows_affected(),
            "Marked unseen recordings unavailable"
        );
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) FROM recordings")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
