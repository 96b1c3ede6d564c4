//! Comment repository

use crate::db::DynDatabasePool;
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, parent_id, content, depth, created_at, updated_at, deleted_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(
        &self,
        post_id: i64,
        author_id: i64,
        parent_id: Option<i64>,
        content: &str,
        depth: i64,
    ) -> Result<Comment>;

    /// Get by ID, including soft-deleted comments
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Every comment of a post in creation order, deleted ones included
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Comment>>;

    async fn update_content(&self, id: i64, content: &str) -> Result<bool>;

    async fn soft_delete(&self, id: i64) -> Result<bool>;

    async fn restore(&self, id: i64) -> Result<bool>;

    async fn count_visible_by_post(&self, post_id: i64) -> Result<i64>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(
        &self,
        post_id: i64,
        author_id: i64,
        parent_id: Option<i64>,
        content: &str,
        depth: i64,
    ) -> Result<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, author_id, parent_id, content, depth, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(parent_id)
        .bind(content)
        .bind(depth)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id,
            author_id,
            parent_id,
            content: content.to_string(),
            depth,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get comment by ID")?;
        Ok(row.as_ref().map(row_to_comment))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list comments")?;
        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE author_id = ? ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(author_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list comments by author")?;
        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update comment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE comments SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE comments SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to restore comment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_visible_by_post(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = ? AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count comments")?;
        Ok(count)
    }
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        depth: row.get("depth"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}
