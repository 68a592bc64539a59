//! Meeting (session) repository
//!
//! Sessions belong to the hosting application. The sync engine only reads
//! them; `insert` exists for the host and for fixtures.

use crate::error::{LibraryError, Result};
use crate::models::Meeting;
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// Find a session by local row id
    async fn find_by_id(&self, id: &str) -> Result<Option<Meeting>>;

    /// All sessions sharing a session id, in insertion order
    async fn find_by_meeting_id(&self, meeting_id: &str) -> Result<Vec<Meeting>>;

    /// Insert a session row
    async fn insert(&self, meeting: &Meeting) -> Result<()>;
}

/// SQLite implementation of MeetingRepository
pub struct SqliteMeetingRepository {
    pool: SqlitePool,
}

impl SqliteMeetingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Sessions sharing `meeting_id`, in insertion order
///
/// Runs on the given connection so the session match of a recording sees
/// the same transaction as its writes.
pub async fn candidates_for(conn: &mut SqliteConnection, meeting_id: &str) -> Result<Vec<Meeting>> {
    let meetings = query_as::<_, Meeting>(
        "SELECT id, meeting_id, create_time, room_id, name FROM meetings WHERE meeting_id = ? ORDER BY rowid ASC",
    )
    .bind(meeting_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(meetings)
}

#[async_trait]
impl MeetingRepository for SqliteMeetingRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Meeting>> {
        let meeting = query_as::<_, Meeting>("SELECT * FROM meetings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(meeting)
    }

    async fn find_by_meeting_id(&self, meeting_id: &str) -> Result<Vec<Meeting>> {
        let mut conn = self.pool.acquire().await?;
        candidates_for(&mut conn, meeting_id).await
    }

    async fn insert(&self, meeting: &Meeting) -> Result<()> {
        if meeting.meeting_id.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "meeting_id".to_string(),
                message: "Session id cannot be empty".to_string(),
            });
        }

        query(
            "INSERT INTO meetings (id, meeting_id, create_time, room_id, name) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&meeting.id)
        .bind(&meeting.meeting_id)
        .bind(meeting.create_time)
        .bind(&meeting.room_id)
        .bind(&meeting.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
