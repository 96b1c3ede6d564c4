//! Notification repository

use crate::db::DynDatabasePool;
use crate::models::{ListParams, NewNotification, Notification, NotificationKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, message, entity_type, entity_id, actor_id, \
     is_read, read_at, created_at";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// Get a live notification belonging to the user
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Notification>>;

    async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool>;

    async fn mark_all_read(&self, user_id: i64) -> Result<u64>;

    async fn soft_delete(&self, id: i64, user_id: i64) -> Result<bool>;
}

pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, entity_type, entity_id, actor_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.kind.to_string())
        .bind(&notification.message)
        .bind(&notification.entity_type)
        .bind(notification.entity_id)
        .bind(notification.actor_id)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create notification")?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id: notification.user_id,
            kind: notification.kind,
            message: notification.message.clone(),
            entity_type: notification.entity_type.clone(),
            entity_id: notification.entity_id,
            actor_id: notification.actor_id,
            is_read: false,
            read_at: None,
            created_at: now,
        })
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get notification")?;
        row.as_ref().map(row_to_notification).transpose()
    }

    async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)> {
        let unread_clause = if unread_only { " AND is_read = 0" } else { "" };

        let count_sql = format!(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND deleted_at IS NULL{}",
            unread_clause
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count notifications")?;

        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = ? AND deleted_at IS NULL{} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS, unread_clause
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list notifications")?;

        let items = rows.iter().map(row_to_notification).collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count unread notifications")?;
        Ok(count)
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?)
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to mark notification read")?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = 1, read_at = ?
            WHERE user_id = ? AND is_read = 0 AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to mark notifications read")?;
        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET deleted_at = ? WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete notification")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: NotificationKind::from_str(&kind)?,
        message: row.get("message"),
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        actor_id: row.get("actor_id"),
        is_read: row.get("is_read"),
        read_at: row.get("read_at"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{NewUser, UserRole};

    async fn setup() -> (SqlxNotificationRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["owner", "other"] {
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
        (SqlxNotificationRepository::new(pool), ids[0], ids[1])
    }

    fn note(user_id: i64) -> NewNotification {
        NewNotification {
            user_id,
            kind: NotificationKind::PostComment,
            message: "New comment".to_string(),
            entity_type: Some("post".to_string()),
            entity_id: Some(1),
            actor_id: None,
        }
    }

    #[tokio::test]
    async fn test_read_state_is_scoped_to_owner() {
        let (repo, owner, other) = setup().await;
        let first = repo.create(&note(owner)).await.unwrap();
        repo.create(&note(owner)).await.unwrap();

        assert_eq!(repo.unread_count(owner).await.unwrap(), 2);
        assert!(!repo.mark_read(first.id, other).await.unwrap());
        assert!(repo.mark_read(first.id, owner).await.unwrap());
        assert_eq!(repo.unread_count(owner).await.unwrap(), 1);

        let (unread, total) = repo.list(owner, true, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert!(!unread[0].is_read);

        assert_eq!(repo.mark_all_read(owner).await.unwrap(), 1);
        assert_eq!(repo.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_notification() {
        let (repo, owner, other) = setup().await;
        let item = repo.create(&note(owner)).await.unwrap();

        assert!(!repo.soft_delete(item.id, other).await.unwrap());
        assert!(repo.soft_delete(item.id, owner).await.unwrap());
        assert!(repo.get_for_user(item.id, owner).await.unwrap().is_none());
        let (_, total) = repo.list(owner, false, &ListParams::default()).await.unwrap();
        assert_eq!(total, 0);
    }
}
