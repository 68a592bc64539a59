//! Metadata repository trait and implementation
//!
//! Metadata is polymorphic over its owner: every query is keyed by the
//! `(owner_kind, owner_id)` pair, never by a recording id alone.

use crate::error::{LibraryError, Result};
use crate::models::{MetadataItem, MetadataOwner};
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Metadata repository interface for data access operations
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// List the metadata items of an owner, ordered by name
    async fn list(&self, owner: &MetadataOwner) -> Result<Vec<MetadataItem>>;

    /// Find one item by owner and name
    async fn find(&self, owner: &MetadataOwner, name: &str) -> Result<Option<MetadataItem>>;

    /// Insert or replace the content of the item named `name`
    ///
    /// # Errors
    /// Returns `InvalidInput` if the name is blank.
    async fn upsert(&self, owner: &MetadataOwner, name: &str, content: &str)
        -> Result<MetadataItem>;

    /// Delete one item
    ///
    /// # Returns
    /// - `Ok(true)` if the item was deleted
    /// - `Ok(false)` if it did not exist
    async fn delete(&self, owner: &MetadataOwner, name: &str) -> Result<bool>;

    /// Delete every item of an owner, returning the number removed
    async fn delete_all(&self, owner: &MetadataOwner) -> Result<u64>;
}

/// SQLite implementation of MetadataRepository
pub struct SqliteMetadataRepository {
    pool: SqlitePool,
}

impl SqliteMetadataRepository {
    /// Create a new SqliteMetadataRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// Connection-level operations. The sync engine runs these on its per-record
// transaction; the repository runs them on a pooled connection.

/// Metadata items of an owner, ordered by name
pub async fn list_for(conn: &mut SqliteConnection, owner: &MetadataOwner) -> Result<Vec<MetadataItem>> {
    let items = query_as::<_, MetadataItem>(
        "SELECT * FROM metadata WHERE owner_kind = ? AND owner_id = ? ORDER BY name ASC",
    )
    .bind(owner.kind.as_str())
    .bind(&owner.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Insert a new item; a duplicate `(owner, name)` is a unique violation
pub async fn insert_item(conn: &mut SqliteConnection, item: &MetadataItem) -> Result<()> {
    query("INSERT INTO metadata (id, owner_kind, owner_id, name, content) VALUES (?, ?, ?, ?, ?)")
        .bind(&item.id)
        .bind(&item.owner_kind)
        .bind(&item.owner_id)
        .bind(&item.name)
        .bind(&item.content)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn update_content(conn: &mut SqliteConnection, id: &str, content: &str) -> Result<()> {
    query("UPDATE metadata SET content = ? WHERE id = ?")
        .bind(content)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn delete_by_id(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    query("DELETE FROM metadata WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[async_trait]
impl MetadataRepository for SqliteMetadataRepository {
    async fn list(&self, owner: &MetadataOwner) -> Result<Vec<MetadataItem>> {
        let mut conn = self.pool.acquire().await?;
        list_for(&mut conn, owner).await
    }

    async fn find(&self, owner: &MetadataOwner, name: &str) -> Result<Option<MetadataItem>> {
        let item = query_as::<_, MetadataItem>(
            "SELECT * FROM metadata WHERE owner_kind = ? AND owner_id = ? AND name = ?",
        )
        .bind(owner.kind.as_str())
        .bind(&owner.id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn upsert(
        &self,
        owner: &MetadataOwner,
        name: &str,
        content: &str,
    ) -> Result<MetadataItem> {
        if name.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "name".to_string(),
                message: "Metadata name cannot be empty".to_string(),
            });
        }

        let item = MetadataItem::new(owner, name, content);
        query(
            r#"
            INSERT INTO metadata (id, owner_kind, owner_id, name, content)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (owner_kind, owner_id, name) DO UPDATE SET content = excluded.content
            "#,
        )
        .bind(&item.id)
        .bind(&item.owner_kind)
        .bind(&item.owner_id)
        .bind(&item.name)
        .bind(&item.content)
        .execute(&self.pool)
        .await?;

        self.find(owner, name)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Metadata".to_string(),
                id: format!("{}/{}", owner, name),
            })
    }

    async fn delete(&self, owner: &MetadataOwner, name: &str) -> Result<bool> {
        let result =
            query("DELETE FROM metadata WHERE owner_kind = ? AND owner_id = ? AND name = ?")
                .bind(owner.kind.as_str())
                .bind(&owner.id)
                .bind(name)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, owner: &MetadataOwner) -> Result<u64> {
        let result = query("DELETE FROM metadata WHERE owner_kind = ? AND owner_id = ?")
            .bind(owner.kind.as_str())
            .bind(&owner.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::OwnerKind;

    #[tokio::test]
    async fn test_upsert_replaces_content() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMetadataRepository::new(pool);
        let owner = MetadataOwner::recording("r-1");

        let first = repo.upsert(&owner, "title", "Draft").await.unwrap();
        let second = repo.upsert(&owner, "title", "Final").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "Final");
        assert_eq!(repo.list(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMetadataRepository::new(pool);
        let recording = MetadataOwner::recording("shared-id");
        let room = MetadataOwner::new(OwnerKind::Room, "shared-id");

        repo.upsert(&recording, "topic", "recording").await.unwrap();
        repo.upsert(&room, "topic", "room").await.unwrap();

        assert_eq!(repo.delete_all(&recording).await.unwrap(), 1);
        let remaining = repo.list(&room).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "room");
    }

    #[tokio::test]
    async fn test_delete_and_blank_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMetadataRepository::new(pool);
        let owner = MetadataOwner::recording("r-1");

        repo.upsert(&owner, "a", "1").await.unwrap();
        assert!(repo.delete(&owner, "a").await.unwrap());
        assert!(!repo.delete(&owner, "a").await.unwrap());
        assert!(repo.upsert(&owner, " ", "x").await.is_err());
    }
}
