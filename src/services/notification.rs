//! Notification service
//!
//! Other services call [`NotificationService::notify`]; members read and
//! clear their own inbox. A notification that belongs to someone else is
//! reported as missing.

use std::sync::Arc;

use crate::db::repositories::NotificationRepository;
use crate::models::{ListParams, NewNotification, Notification, NotificationKind, PagedResult};

use super::error::{ServiceError, ServiceResult};

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Deliver a notification. Failures are logged rather than returned so
    /// the triggering action still succeeds.
    pub async fn notify(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: String,
        entity: Option<(&str, i64)>,
        actor_id: Option<i64>,
    ) {
        let notification = NewNotification {
            user_id,
            kind,
            message,
            entity_type: entity.map(|(t, _)| t.to_string()),
            entity_id: entity.map(|(_, id)| id),
            actor_id,
        };
        if let Err(e) = self.repo.create(&notification).await {
            tracing::warn!("Failed to notify user {}: {:#}", user_id, e);
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Notification>> {
        let (items, total) = self.repo.list(user_id, unread_only, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn unread_count(&self, user_id: i64) -> ServiceResult<i64> {
        Ok(self.repo.unread_count(user_id).await?)
    }

    pub async fn mark_read(&self, user_id: i64, id: i64) -> ServiceResult<Notification> {
        self.owned(user_id, id).await?;
        self.repo.mark_read(id, user_id).await?;
        self.owned(user_id, id).await
    }

    pub async fn mark_all_read(&self, user_id: i64) -> ServiceResult<u64> {
        Ok(self.repo.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> ServiceResult<()> {
        if !self.repo.soft_delete(id, user_id).await? {
            return Err(ServiceError::not_found("Notification"));
        }
        Ok(())
    }

    async fn owned(&self, user_id: i64, id: i64) -> ServiceResult<Notification> {
        self.repo
            .get_for_user(id, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxNotificationRepository;
    use crate::models::UserRole;
    use crate::services::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_inbox_lifecycle() {
        let pool = migrated_pool().await;
        let owner = insert_user(&pool, "owner", UserRole::Member).await;
        let stranger = insert_user(&pool, "stranger", UserRole::Member).await;
        let service = NotificationService::new(SqlxNotificationRepository::boxed(pool.clone()));

        for i in 0..3 {
            service
                .notify(
                    owner.id,
                    NotificationKind::PostComment,
                    format!("comment {}", i),
                    Some(("post", 1)),
                    Some(stranger.id),
                )
                .await;
        }
        assert_eq!(service.unread_count(owner.id).await.expect("Count"), 3);

        let page = service
            .list(owner.id, false, &ListParams::default())
            .await
            .expect("List");
        assert_eq!(page.total, 3);
        let first = page.items[0].id;

        // Only the owner may touch it
        assert!(matches!(
            service.mark_read(stranger.id, first).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(stranger.id, first).await,
            Err(ServiceError::NotFound(_))
        ));

        let read = service.mark_read(owner.id, first).await.expect("Mark read");
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        let unread = service
            .list(owner.id, true, &ListParams::default())
            .await
            .expect("List unread");
        assert_eq!(unread.total, 2);

        assert_eq!(service.mark_all_read(owner.id).await.expect("Mark all"), 2);
        assert_eq!(service.unread_count(owner.id).await.expect("Count"), 0);

        service.delete(owner.id, first).await.expect("Delete");
        let page = service
            .list(owner.id, false, &ListParams::default())
            .await
            .expect("List");
        assert_eq!(page.total, 2);
    }
}
