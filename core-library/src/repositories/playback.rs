//! Playback type and playback format repositories
//!
//! Playback types are a shared lookup table: formats of every recording point
//! at them, and a type nobody references any more is garbage.

use crate::error::{LibraryError, Result};
use crate::models::{PlaybackFormat, PlaybackFormatView, PlaybackType};
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

/// Playback type repository interface
#[async_trait]
pub trait PlaybackTypeRepository: Send + Sync {
    /// List all playback types ordered by identifier
    async fn list(&self) -> Result<Vec<PlaybackType>>;

    /// Find a playback type by its identifier ("presentation", "video", ...)
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<PlaybackType>>;

    /// Insert a new playback type
    ///
    /// Inserting a type flagged default clears the flag on every other type.
    async fn insert(&self, playback_type: &PlaybackType) -> Result<()>;

    /// Make `identifier` the only default playback type
    ///
    /// # Errors
    /// Returns `NotFound` if no type has that identifier.
    async fn set_default(&self, identifier: &str) -> Result<()>;

    /// Remove the default flag from every type
    async fn clear_default(&self) -> Result<()>;

    /// Show or hide a playback type
    ///
    /// # Returns
    /// `Ok(false)` if no type has that identifier
    async fn set_visible(&self, identifier: &str, visible: bool) -> Result<bool>;

    /// Delete every playback type that no playback format references
    ///
    /// # Returns
    /// Number of types deleted
    async fn delete_orphans(&self) -> Result<u64>;
}

/// Playback format repository interface
#[async_trait]
pub trait PlaybackFormatRepository: Send + Sync {
    /// List the playback formats of a recording, joined with their type
    async fn list_by_recording(&self, recording_id: &str) -> Result<Vec<PlaybackFormatView>>;

    /// Count formats referencing a playback type
    async fn count_by_type(&self, playback_type_id: &str) -> Result<i64>;
}

/// Columns of [`PlaybackFormatView`], joined from formats and types
pub(crate) const FORMAT_VIEW_SELECT: &str = r#"
    SELECT pf.id, pf.recording_id, pf.playback_type_id,
           pt.identifier AS format_type, pf.url, pf.length,
           pt.visible, pt.is_default
    FROM playback_formats pf
    JOIN playback_types pt ON pt.id = pf.playback_type_id
"#;

// Connection-level operations shared by the repositories and the sync
// engine's per-record transaction.

pub async fn find_type_by_identifier(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> Result<Option<PlaybackType>> {
    let playback_type =
        query_as::<_, PlaybackType>("SELECT * FROM playback_types WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(playback_type)
}

/// Insert a playback type, moving the default flag to it when it has one
///
/// Run inside a transaction so the flag is never observed on two types.
pub async fn insert_type(conn: &mut SqliteConnection, playback_type: &PlaybackType) -> Result<()> {
    if playback_type.identifier.trim().is_empty() {
        return Err(LibraryError::InvalidInput {
            field: "identifier".to_string(),
            message: "Playback type identifier cannot be empty".to_string(),
        });
    }

    if playback_type.is_default {
        query("UPDATE playback_types SET is_default = 0 WHERE is_default = 1")
            .execute(&mut *conn)
            .await?;
    }

    query("INSERT INTO playback_types (id, identifier, visible, is_default) VALUES (?, ?, ?, ?)")
        .bind(&playback_type.id)
        .bind(&playback_type.identifier)
        .bind(playback_type.visible)
        .bind(playback_type.is_default)
        .execute(&mut *conn)
        .await?;

    info!(
        identifier = %playback_type.identifier,
        is_default = playback_type.is_default,
        "Created playback type"
    );
    Ok(())
}

/// Delete every playback type no playback format references
pub async fn delete_orphan_types(conn: &mut SqliteConnection) -> Result<u64> {
    let result = query(
        r#"
        DELETE FROM playback_types
        WHERE NOT EXISTS (
            SELECT 1 FROM playback_formats pf WHERE pf.playback_type_id = playback_types.id
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        debug!(deleted = result.rows_affected(), "Deleted orphan playback types");
    }
    Ok(result.rows_affected())
}

/// Formats of a recording with their type, ordered by type identifier
pub async fn list_formats(
    conn: &mut SqliteConnection,
    recording_id: &str,
) -> Result<Vec<PlaybackFormatView>> {
    let sql = format!(
        "{} WHERE pf.recording_id = ? ORDER BY pt.identifier ASC",
        FORMAT_VIEW_SELECT
    );
    let formats = query_as::<_, PlaybackFormatView>(&sql)
        .bind(recording_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(formats)
}

pub async fn insert_format(conn: &mut SqliteConnection, format: &PlaybackFormat) -> Result<()> {
    query(
        "INSERT INTO playback_formats (id, recording_id, playback_type_id, url, length) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&format.id)
    .bind(&format.recording_id)
    .bind(&format.playback_type_id)
    .bind(&format.url)
    .bind(format.length)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_format(
    conn: &mut SqliteConnection,
    id: &str,
    url: &str,
    length: f64,
) -> Result<()> {
    query("UPDATE playback_formats SET url = ?, length = ? WHERE id = ?")
        .bind(url)
        .bind(length)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn delete_format(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    query("DELETE FROM playback_formats WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// SQLite implementation of PlaybackTypeRepository
pub struct SqlitePlaybackTypeRepository {
    pool: SqlitePool,
}

impl SqlitePlaybackTypeRepository {
    /// Create a new SqlitePlaybackTypeRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaybackTypeRepository for SqlitePlaybackTypeRepository {
    async fn list(&self) -> Result<Vec<PlaybackType>> {
        let types =
            query_as::<_, PlaybackType>("SELECT * FROM playback_types ORDER BY identifier ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(types)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<PlaybackType>> {
        let mut conn = self.pool.acquire().await?;
        find_type_by_identifier(&mut conn, identifier).await
    }

    async fn insert(&self, playback_type: &PlaybackType) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_type(&mut tx, playback_type).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_default(&self, identifier: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if find_type_by_identifier(&mut tx, identifier).await?.is_none() {
            return Err(LibraryError::NotFound {
                entity_type: "PlaybackType".to_string(),
                id: identifier.to_string(),
            });
        }

        query("UPDATE playback_types SET is_default = (identifier = ?)")
            .bind(identifier)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(identifier, "Default playback type changed");
        Ok(())
    }

    async fn clear_default(&self) -> Result<()> {
        query("UPDATE playback_types SET is_default = 0 WHERE is_default = 1")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_visible(&self, identifier: &str, visible: bool) -> Result<bool> {
        let result = query("UPDATE playback_types SET visible = ? WHERE identifier = ?")
            .bind(visible)
            .bind(identifier)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_orphan_types(&mut conn).await
    }
}

/// SQLite implementation of PlaybackFormatRepository
pub struct SqlitePlaybackFormatRepository {
    pool: SqlitePool,
}

impl SqlitePlaybackFormatRepository {
    /// Create a new SqlitePlaybackFormatRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaybackFormatRepository for SqlitePlaybackFormatRepository {
    async fn list_by_recording(&self, recording_id: &str) -> Result<Vec<PlaybackFormatView>> {
        let mut conn = self.pool.acquire().await?;
        list_formats(&mut conn, recording_id).await
    }

    async fn count_by_type(&self, playback_type_id: &str) -> Result<i64> {
        let count: i64 =
            query_as("SELECT COUNT(*) FROM playback_formats WHERE playback_type_id = ?")
                .bind(playback_type_id)
                .fetch_one(&self.pool)
                .await
                .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
