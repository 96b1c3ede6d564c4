//! Forbidden word repository

use crate::db::DynDatabasePool;
use crate::models::ForbiddenWord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ForbiddenWordRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ForbiddenWord>>;

    async fn create(&self, word: &str, created_by: Option<i64>) -> Result<ForbiddenWord>;

    async fn get_by_word(&self, word: &str) -> Result<Option<ForbiddenWord>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxForbiddenWordRepository {
    pool: DynDatabasePool,
}

impl SqlxForbiddenWordRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ForbiddenWordRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ForbiddenWordRepository for SqlxForbiddenWordRepository {
    async fn list(&self) -> Result<Vec<ForbiddenWord>> {
        let rows = sqlx::query(
            "SELECT id, word, created_by, created_at FROM forbidden_words ORDER BY word",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list forbidden words")?;
        Ok(rows.iter().map(row_to_word).collect())
    }

    async fn create(&self, word: &str, created_by: Option<i64>) -> Result<ForbiddenWord> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO forbidden_words (word, created_by, created_at) VALUES (?, ?, ?)",
        )
        .bind(word)
        .bind(created_by)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add forbidden word")?;

        Ok(ForbiddenWord {
            id: result.last_insert_rowid(),
            word: word.to_string(),
            created_by,
            created_at: now,
        })
    }

    async fn get_by_word(&self, word: &str) -> Result<Option<ForbiddenWord>> {
        let row = sqlx::query(
            "SELECT id, word, created_by, created_at FROM forbidden_words WHERE word = ?",
        )
        .bind(word)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get forbidden word")?;
        Ok(row.as_ref().map(row_to_word))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM forbidden_words WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete forbidden word")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_word(row: &sqlx::sqlite::SqliteRow) -> ForbiddenWord {
    ForbiddenWord {
        id: row.get("id"),
        word: row.get("word"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}
