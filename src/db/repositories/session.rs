//! Session repository
//!
//! Login sessions keyed by the digest of their refresh token.

use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        ip_address: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>>;

    async fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Delete all sessions for a user except one
    async fn delete_by_user_except(&self, user_id: i64, keep_id: i64) -> Result<u64>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        ip_address: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (user_id, token_hash, ip_address, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(ip_address)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create session")?;

        Ok(Session {
            id: result.last_insert_rowid(),
            user_id,
            token_hash: token_hash.to_string(),
            ip_address: ip_address.map(str::to_string),
            expires_at,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, ip_address, expires_at, created_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get session by ID")?;

        Ok(row.as_ref().map(row_to_session))
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, ip_address, expires_at, created_at FROM sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get session by token")?;

        Ok(row.as_ref().map(row_to_session))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete user sessions")?;
        Ok(result.rows_affected())
    }

    async fn delete_by_user_except(&self, user_id: i64, keep_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id != ?")
            .bind(user_id)
            .bind(keep_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete other user sessions")?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        ip_address: row.get("ip_address"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}
