//! Post subscriptions
//!
//! Subscribers hear about new comments on a post. Subscribing twice is a
//! no-op that returns the existing subscription.

use std::sync::Arc;

use crate::db::repositories::{PostRepository, SubscriptionRepository};
use crate::models::{Post, Subscription};

use super::error::{ServiceError, ServiceResult};

pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<dyn SubscriptionRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { repo, post_repo }
    }

    pub async fn subscribe(&self, user_id: i64, post_id: i64) -> ServiceResult<Subscription> {
        self.post_repo
            .get_by_id(post_id)
            .await?
            .filter(Post::is_visible)
            .ok_or_else(|| ServiceError::not_found("Post"))?;
        Ok(self.repo.subscribe(user_id, post_id).await?)
    }

    pub async fn unsubscribe(&self, user_id: i64, post_id: i64) -> ServiceResult<()> {
        if !self.repo.unsubscribe(user_id, post_id).await? {
            return Err(ServiceError::not_found("Subscription"));
        }
        Ok(())
    }

    pub async fn list(&self, user_id: i64) -> ServiceResult<Vec<Subscription>> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn subscriber_ids(&self, post_id: i64) -> ServiceResult<Vec<i64>> {
        Ok(self.repo.subscriber_ids(post_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPostRepository, SqlxSubscriptionRepository};
    use crate::models::UserRole;
    use crate::services::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let reader = insert_user(&pool, "reader", UserRole::Member).await;
        let posts = SqlxPostRepository::boxed(pool.clone());
        let post = posts.create(author.id, None, "Watched", "Body").await.expect("Post");
        let service = SubscriptionService::new(SqlxSubscriptionRepository::boxed(pool.clone()), posts);

        let first = service.subscribe(reader.id, post.id).await.expect("Subscribe");
        let again = service.subscribe(reader.id, post.id).await.expect("Subscribe again");
        assert_eq!(first.id, again.id);
        assert_eq!(again.post_title.as_deref(), Some("Watched"));

        let mine = service.list(reader.id).await.expect("List");
        assert_eq!(mine.len(), 1);

        service.unsubscribe(reader.id, post.id).await.expect("Unsubscribe");
        assert!(matches!(
            service.unsubscribe(reader.id, post.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.subscribe(reader.id, 4242).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
