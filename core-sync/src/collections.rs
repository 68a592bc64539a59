//! # Recording Child Collections
//!
//! [`CollectionStore`] implementations for the two child collections of a
//! recording. Both operate on the connection of the per-record transaction,
//! so a recording and its children commit together. Row access goes through
//! the connection-level functions of the library repositories.

use crate::nested::CollectionStore;
use crate::payload::PlaybackFormatPayload;
use crate::Result;
use async_trait::async_trait;
use core_library::models::{MetadataItem, MetadataOwner, PlaybackFormat, PlaybackFormatView, PlaybackType};
use core_library::repositories::{metadata, playback};
use sqlx::SqliteConnection;

/// One desired metadata entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub name: String,
    pub content: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata of one owner, keyed by name
pub struct MetadataStore<'c> {
    conn: &'c mut SqliteConnection,
    owner: MetadataOwner,
}

impl<'c> MetadataStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection, owner: MetadataOwner) -> Self {
        Self { conn, owner }
    }
}

#[async_trait]
impl<'c> CollectionStore for MetadataStore<'c> {
    type Key = String;
    type Persisted = MetadataItem;
    type Desired = MetadataEntry;

    fn persisted_key(&self, item: &MetadataItem) -> String {
        item.name.clone()
    }

    fn desired_key(&self, item: &MetadataEntry) -> String {
        item.name.clone()
    }

    fn differs(&self, persisted: &MetadataItem, desired: &MetadataEntry) -> bool {
        persisted.content != desired.content
    }

    async fn load(&mut self) -> Result<Vec<MetadataItem>> {
        Ok(metadata::list_for(self.conn, &self.owner).await?)
    }

    async fn update(&mut self, persisted: &MetadataItem, desired: &MetadataEntry) -> Result<()> {
        Ok(metadata::update_content(self.conn, &persisted.id, &desired.content).await?)
    }

    async fn delete(&mut self, persisted: &MetadataItem) -> Result<()> {
        Ok(metadata::delete_by_id(self.conn, &persisted.id).await?)
    }

    async fn create(&mut self, desired: &MetadataEntry) -> Result<()> {
        let item = MetadataItem::new(&self.owner, &desired.name, &desired.content);
        Ok(metadata::insert_item(self.conn, &item).await?)
    }
}

// ============================================================================
// Playback formats
// ============================================================================

/// Playback formats of one recording, keyed by playback type identifier
pub struct PlaybackStore<'c> {
    conn: &'c mut SqliteConnection,
    recording_id: String,
    /// Identifier flagged default when its type is first created
    default_type: Option<String>,
}

impl<'c> PlaybackStore<'c> {
    pub fn new(
        conn: &'c mut SqliteConnection,
        recording_id: impl Into<String>,
        default_type: Option<String>,
    ) -> Self {
        Self {
            conn,
            recording_id: recording_id.into(),
            default_type,
        }
    }

    /// Find the playback type with `identifier`, creating it when missing
    ///
    /// New types are visible. A new type whose identifier is the configured
    /// default takes the default flag from every other type.
    async fn resolve_or_create_playback_type(&mut self, identifier: &str) -> Result<String> {
        if let Some(existing) = playback::find_type_by_identifier(self.conn, identifier).await? {
            return Ok(existing.id);
        }

        let mut playback_type = PlaybackType::new(identifier);
        playback_type.is_default = self.default_type.as_deref() == Some(identifier);
        playback::insert_type(self.conn, &playback_type).await?;

        Ok(playback_type.id)
    }
}

#[async_trait]
impl<'c> CollectionStore for PlaybackStore<'c> {
    type Key = String;
    type Persisted = PlaybackFormatView;
    type Desired = PlaybackFormatPayload;

    fn persisted_key(&self, item: &PlaybackFormatView) -> String {
        item.format_type.clone()
    }

    fn desired_key(&self, item: &PlaybackFormatPayload) -> String {
        item.format_type.clone()
    }

    fn differs(&self, persisted: &PlaybackFormatView, desired: &PlaybackFormatPayload) -> bool {
        persisted.url != desired.url || persisted.length != desired.length
    }

    async fn load(&mut self) -> Result<Vec<PlaybackFormatView>> {
        Ok(playback::list_formats(self.conn, &self.recording_id).await?)
    }

    async fn update(
        &mut self,
        persisted: &PlaybackFormatView,
        desired: &PlaybackFormatPayload,
    ) -> Result<()> {
        Ok(playback::update_format(self.conn, &persisted.id, &desired.url, desired.length).await?)
    }

    async fn delete(&mut self, persisted: &PlaybackFormatView) -> Result<()> {
        Ok(playback::delete_format(self.conn, &persisted.id).await?)
    }

    async fn create(&mut self, desired: &PlaybackFormatPayload) -> Result<()> {
        let playback_type_id = self
            .resolve_or_create_playback_type(&desired.format_type)
            .await?;

        let format = PlaybackFormat::new(
            self.recording_id.as_str(),
            playback_type_id,
            desired.url.as_str(),
            desired.length,
        );
        Ok(playback::insert_format(self.conn, &format).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nested::reconcile;
    use core_library::create_test_pool;
    use core_library::models::Recording;
    use sqlx::SqlitePool;

    async fn seed_recording(pool: &SqlitePool, record_id: &str) -> Recording {
        sqlx::query(
            "INSERT OR IGNORE INTO servers (id, name, url, created_at) VALUES ('s1', 'Main', 'https://main', 0)",
        )
        .execute(pool)
        .await
        .unwrap();

        let recording = Recording::new(record_id, "s1");
        sqlx::query(
            "INSERT INTO recordings (id, record_id, server_id, created_at, updated_at) VALUES (?, ?, ?, 0, 0)",
        )
        .bind(&recording.id)
        .bind(&recording.record_id)
        .bind(&recording.server_id)
        .execute(pool)
        .await
        .unwrap();
        recording
    }

    fn format(format_type: &str, url: &str, length: f64) -> PlaybackFormatPayload {
        PlaybackFormatPayload {
            format_type: format_type.to_string(),
            url: url.to_string(),
            length,
        }
    }

    async fn type_identifiers(pool: &SqlitePool) -> Vec<(String, bool)> {
        sqlx::query_as("SELECT identifier, is_default FROM playback_types ORDER BY identifier")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_metadata_reconcile_round() {
        let pool = create_test_pool().await.unwrap();
        let recording = seed_recording(&pool, "r-1").await;
        let owner = MetadataOwner::recording(&recording.id);
        let mut conn = pool.acquire().await.unwrap();

        let first = vec![MetadataEntry::new("A", "1"), MetadataEntry::new("B", "2")];
        reconcile(&mut MetadataStore::new(&mut conn, owner.clone()), first)
            .await
            .unwrap();

        let desired = vec![MetadataEntry::new("B", "3"), MetadataEntry::new("C", "4")];
        let changes = reconcile(&mut MetadataStore::new(&mut conn, owner.clone()), desired.clone())
            .await
            .unwrap();
        assert_eq!((changes.created, changes.updated, changes.deleted), (1, 1, 1));

        let again = reconcile(&mut MetadataStore::new(&mut conn, owner.clone()), desired)
            .await
            .unwrap();
        assert!(again.is_noop());

        let stored: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, content FROM metadata WHERE owner_id = ? ORDER BY name",
        )
        .bind(&owner.id)
        .fetch_all(&mut *conn)
        .await
        .unwrap();
        assert_eq!(
            stored,
            vec![
                ("B".to_string(), "3".to_string()),
                ("C".to_string(), "4".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_playback_types_created_lazily_with_default_flag() {
        let pool = create_test_pool().await.unwrap();
        let recording = seed_recording(&pool, "r-1").await;

        {
            let mut conn = pool.acquire().await.unwrap();
            let mut store =
                PlaybackStore::new(&mut conn, &recording.id, Some("presentation".to_string()));
            let changes = reconcile(
                &mut store,
                vec![
                    format("presentation", "https://p", 2.5),
                    format("video", "https://v", 2.5),
                ],
            )
            .await
            .unwrap();
            assert_eq!(changes.created, 2);
        }

        assert_eq!(
            type_identifiers(&pool).await,
            vec![("presentation".to_string(), true), ("video".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_playback_update_and_orphan_collection() {
        let pool = create_test_pool().await.unwrap();
        let first = seed_recording(&pool, "r-1").await;
        let second = seed_recording(&pool, "r-2").await;
        let mut conn = pool.acquire().await.unwrap();

        reconcile(
            &mut PlaybackStore::new(&mut conn, &first.id, None),
            vec![format("presentation", "https://p1", 1.0), format("notes", "https://n", 0.0)],
        )
        .await
        .unwrap();
        reconcile(
            &mut PlaybackStore::new(&mut conn, &second.id, None),
            vec![format("presentation", "https://p2", 3.0)],
        )
        .await
        .unwrap();

        // Dropping "notes" from the only recording using it orphans the type
        let changes = reconcile(
            &mut PlaybackStore::new(&mut conn, &first.id, None),
            vec![format("presentation", "https://p1", 1.5)],
        )
        .await
        .unwrap();
        assert_eq!((changes.updated, changes.deleted), (1, 1));

        assert_eq!(playback::delete_orphan_types(&mut conn).await.unwrap(), 1);
        assert_eq!(playback::delete_orphan_types(&mut conn).await.unwrap(), 0);
        drop(conn);

        assert_eq!(
            type_identifiers(&pool).await,
            vec![("presentation".to_string(), false)]
        );
    }
}
