//! Recording server repository

use crate::error::{LibraryError, Result};
use crate::models::Server;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Server>>;

    /// Insert a server
    ///
    /// # Errors
    /// Returns `InvalidInput` if the name or url is blank.
    async fn insert(&self, server: &Server) -> Result<()>;

    async fn list(&self) -> Result<Vec<Server>>;
}

/// SQLite implementation of ServerRepository
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Server>> {
        let server = query_as::<_, Server>("SELECT * FROM servers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(server)
    }

    async fn insert(&self, server: &Server) -> Result<()> {
        if server.name.trim().is_empty() || server.url.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "Server".to_string(),
                message: "Server name and url are required".to_string(),
            });
        }

        query("INSERT INTO servers (id, name, url, created_at) VALUES (?, ?, ?, ?)")
            .bind(&server.id)
            .bind(&server.name)
            .bind(&server.url)
            .bind(server.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Server>> {
        let servers = query_as::<_, Server>("SELECT * FROM servers ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_insert_and_find_server() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteServerRepository::new(pool);

        let server = Server::new("Main", "https://recordings.example.org");
        repo.insert(&server).await.unwrap();

        assert_eq!(repo.find_by_id(&server.id).await.unwrap(), Some(server));
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.insert(&Server::new("", "https://x")).await.is_err());
    }
}
