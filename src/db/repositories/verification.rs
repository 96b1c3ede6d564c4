//! Email verification code repository

use crate::db::DynDatabasePool;
use crate::models::EmailVerification;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Store a new code, replacing any earlier code for the user
    async fn replace(
        &self,
        user_id: i64,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerification>;

    /// Most recent code for a user
    async fn latest_for_user(&self, user_id: i64) -> Result<Option<EmailVerification>>;

    async fn delete_for_user(&self, user_id: i64) -> Result<()>;
}

pub struct SqlxVerificationRepository {
    pool: DynDatabasePool,
}

impl SqlxVerificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VerificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VerificationRepository for SqlxVerificationRepository {
    async fn replace(
        &self,
        user_id: i64,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerification> {
        let mut tx = self.pool.sqlite().begin().await?;

        sqlx::query("DELETE FROM email_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear verification codes")?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO email_verifications (user_id, code, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to store verification code")?;

        tx.commit().await?;

        Ok(EmailVerification {
            id: result.last_insert_rowid(),
            user_id,
            code: code.to_string(),
            expires_at,
            created_at: now,
        })
    }

    async fn latest_for_user(&self, user_id: i64) -> Result<Option<EmailVerification>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, code, expires_at, created_at
            FROM email_verifications
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get verification code")?;

        Ok(row.map(|row| EmailVerification {
            id: row.get("id"),
            user_id: row.get("user_id"),
            code: row.get("code"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_for_user(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM email_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete verification codes")?;
        Ok(())
    }
}
