//! Tag repository
//!
//! Tags and their association with posts.

use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get an existing tag by its normalized name or create it
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// All tags with the number of visible posts using them
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>>;

    /// Tag names attached to a post, alphabetically
    async fn names_for_post(&self, post_id: i64) -> Result<Vec<String>>;

    /// Replace the tags attached to a post
    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Delete a tag and its post associations
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        if let Some(tag) = self.get_by_name(name).await? {
            return Ok(tag);
        }

        sqlx::query("INSERT OR IGNORE INTO tags (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now())
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create tag")?;

        self.get_by_name(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Tag not found after insert: {}", name))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tag by ID")?;
        Ok(row.as_ref().map(row_to_tag))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tag by name")?;
        Ok(row.as_ref().map(row_to_tag))
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.created_at,
                   COUNT(p.id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN posts p ON p.id = pt.post_id AND p.deleted_at IS NULL AND p.is_hidden = 0
            GROUP BY t.id
            ORDER BY post_count DESC, t.name ASC
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list tags")?;

        Ok(rows
            .iter()
            .map(|row| TagWithCount {
                tag: row_to_tag(row),
                post_count: row.get("post_count"),
            })
            .collect())
    }

    async fn names_for_post(&self, post_id: i64) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.name FROM tags t
            INNER JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to get post tags")?;
        Ok(names)
    }

    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.sqlite().begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear post tags")?;

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(*tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to attach tag")?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete tag")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxTagRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxTagRepository::new(pool)
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing() {
        let repo = setup().await;
        let first = repo.get_or_create("rust").await.unwrap();
        let second = repo.get_or_create("rust").await.unwrap();
        assert_eq!(first.id, second.id);

        let tags = repo.list_with_counts().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].post_count, 0);
    }

    #[tokio::test]
    async fn test_delete_tag() {
        let repo = setup().await;
        let tag = repo.get_or_create("temp").await.unwrap();
        assert!(repo.delete(tag.id).await.unwrap());
        assert!(repo.get_by_id(tag.id).await.unwrap().is_none());
        assert!(!repo.delete(tag.id).await.unwrap());
    }
}
