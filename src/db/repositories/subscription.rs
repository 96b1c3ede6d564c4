//! Post subscription repository

use crate::db::DynDatabasePool;
use crate::models::Subscription;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Subscribe; an existing subscription is returned unchanged
    async fn subscribe(&self, user_id: i64, post_id: i64) -> Result<Subscription>;

    async fn unsubscribe(&self, user_id: i64, post_id: i64) -> Result<bool>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Subscription>>;

    /// Users following a post
    async fn subscriber_ids(&self, post_id: i64) -> Result<Vec<i64>>;
}

pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn subscribe(&self, user_id: i64, post_id: i64) -> Result<Subscription> {
        sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (user_id, post_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to subscribe")?;

        let row = sqlx::query(
            r#"
            SELECT s.id, s.user_id, s.post_id, s.created_at, p.title AS post_title
            FROM subscriptions s
            INNER JOIN posts p ON p.id = s.post_id
            WHERE s.user_id = ? AND s.post_id = ?
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to load subscription")?;

        Ok(row_to_subscription(&row))
    }

    async fn unsubscribe(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to unsubscribe")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.user_id, s.post_id, s.created_at, p.title AS post_title
            FROM subscriptions s
            INNER JOIN posts p ON p.id = s.post_id
            WHERE s.user_id = ? AND p.deleted_at IS NULL
            ORDER BY s.created_at DESC, s.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list subscriptions")?;

        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn subscriber_ids(&self, post_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM subscriptions WHERE post_id = ? ORDER BY id")
                .bind(post_id)
                .fetch_all(self.pool.sqlite())
                .await
                .context("Failed to list subscribers")?;
        Ok(ids)
    }
}

fn row_to_subscription(row: &sqlx::sqlite::SqliteRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        post_id: row.get("post_id"),
        post_title: row.get("post_title"),
        created_at: row.get("created_at"),
    }
}
