//! Reaction repository

use crate::db::DynDatabasePool;
use crate::models::{Reaction, ReactionKind, TargetType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Insert or replace the user's reaction to a target
    async fn upsert(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
        kind: ReactionKind,
    ) -> Result<Reaction>;

    async fn delete(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool>;

    /// (likes, dislikes) for a target
    async fn counts(&self, target_type: TargetType, target_id: i64) -> Result<(i64, i64)>;

    async fn get_for_user(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
    ) -> Result<Option<Reaction>>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Reaction>>;
}

pub struct SqlxReactionRepository {
    pool: DynDatabasePool,
}

impl SqlxReactionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReactionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReactionRepository for SqlxReactionRepository {
    async fn upsert(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
        kind: ReactionKind,
    ) -> Result<Reaction> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO reactions (user_id, target_type, target_id, kind, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, target_type, target_id)
            DO UPDATE SET kind = excluded.kind, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(target_type.as_str())
        .bind(target_id)
        .bind(kind.to_string())
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to save reaction")?;

        self.get_for_user(user_id, target_type, target_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Reaction not found after upsert"))
    }

    async fn delete(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM reactions WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target_type.as_str())
        .bind(target_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete reaction")?;
        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self, target_type: TargetType, target_id: i64) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'like' THEN 1 ELSE 0 END), 0) AS likes,
                COALESCE(SUM(CASE WHEN kind = 'dislike' THEN 1 ELSE 0 END), 0) AS dislikes
            FROM reactions
            WHERE target_type = ? AND target_id = ?
            "#,
        )
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count reactions")?;

        Ok((row.get("likes"), row.get("dislikes")))
    }

    async fn get_for_user(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
    ) -> Result<Option<Reaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, target_type, target_id, kind, created_at, updated_at
            FROM reactions
            WHERE user_id = ? AND target_type = ? AND target_id = ?
            "#,
        )
        .bind(user_id)
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get reaction")?;

        row.as_ref().map(row_to_reaction).transpose()
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Reaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, target_type, target_id, kind, created_at, updated_at
            FROM reactions
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list reactions")?;

        rows.iter().map(row_to_reaction).collect()
    }
}

fn row_to_reaction(row: &sqlx::sqlite::SqliteRow) -> Result<Reaction> {
    let target_type: String = row.get("target_type");
    let kind: String = row.get("kind");
    Ok(Reaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        target_type: TargetType::from_str(&target_type)?,
        target_id: row.get("target_id"),
        kind: ReactionKind::from_str(&kind)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{NewUser, UserRole};

    #[tokio::test]
    async fn test_upsert_switches_kind_and_counts() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let user = users
                .create(&NewUser {
                    email: format!("{}@example.com", name),
                    username: name.to_string(),
                    nickname: name.to_string(),
                    password_hash: "hash".to_string(),
                    role: UserRole::Member,
                    email_verified: true,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let repo = SqlxReactionRepository::new(pool);

        repo.upsert(ids[0], TargetType::Post, 1, ReactionKind::Like).await.unwrap();
        repo.upsert(ids[1], TargetType::Post, 1, ReactionKind::Like).await.unwrap();
        assert_eq!(repo.counts(TargetType::Post, 1).await.unwrap(), (2, 0));

        let switched = repo.upsert(ids[1], TargetType::Post, 1, ReactionKind::Dislike).await.unwrap();
        assert_eq!(switched.kind, ReactionKind::Dislike);
        assert_eq!(repo.counts(TargetType::Post, 1).await.unwrap(), (1, 1));

        assert!(repo.delete(ids[0], TargetType::Post, 1).await.unwrap());
        assert_eq!(repo.counts(TargetType::Post, 1).await.unwrap(), (0, 1));
        assert_eq!(repo.counts(TargetType::Comment, 1).await.unwrap(), (0, 0));
        assert_eq!(repo.list_by_user(ids[1]).await.unwrap().len(), 1);
    }
}
