//! Post service
//!
//! Deleted and hidden posts never appear in public lists or lookups.
//! Moderators hide, lock and restore posts through `services::moderation`.

use std::sync::Arc;

use crate::config::BoardConfig;
use crate::db::repositories::{
    CategoryRepository, CommentRepository, PostRepository, ReactionRepository,
    SubscriptionRepository, UserRepository,
};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostDetail, PostFilter, TargetType,
    UpdatePostInput, User, UserRole, UserSummary,
};

use super::audit::AuditService;
use super::content_filter::ContentFilterService;
use super::error::{ServiceError, ServiceResult};
use super::tag::TagService;

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    reaction_repo: Arc<dyn ReactionRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    tags: Arc<TagService>,
    filter: Arc<ContentFilterService>,
    audit: Arc<AuditService>,
    title_max: usize,
    body_max: usize,
}

impl PostService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        reaction_repo: Arc<dyn ReactionRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        tags: Arc<TagService>,
        filter: Arc<ContentFilterService>,
        audit: Arc<AuditService>,
    ) -> Self {
        let defaults = BoardConfig::default();
        Self {
            post_repo,
            user_repo,
            category_repo,
            comment_repo,
            reaction_repo,
            subscription_repo,
            tags,
            filter,
            audit,
            title_max: defaults.post_title_max_length,
            body_max: defaults.post_body_max_length,
        }
    }

    pub fn with_limits(mut self, board: &BoardConfig) -> Self {
        self.title_max = board.post_title_max_length;
        self.body_max = board.post_body_max_length;
        self
    }

    pub async fn list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<PostDetail>> {
        let (posts, total) = self.post_repo.list(filter, params).await?;
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            items.push(self.detail(post).await?);
        }
        Ok(PagedResult::new(items, total, params))
    }

    /// Public lookup; counts as a view
    pub async fn view(&self, id: i64) -> ServiceResult<PostDetail> {
        let post = self.get_visible(id).await?;
        self.post_repo.increment_view(id).await?;
        let mut detail = self.detail(post).await?;
        detail.post.view_count += 1;
        Ok(detail)
    }

    /// A post the public may see: not deleted, not hidden
    pub async fn get_visible(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await?
            .filter(Post::is_visible)
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    /// Any post that has not been deleted, hidden ones included
    pub async fn get_live(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    pub async fn create(
        &self,
        author: &User,
        input: CreatePostInput,
        ip: Option<&str>,
    ) -> ServiceResult<PostDetail> {
        let title = self.validate_title(&input.title)?;
        let body = self.validate_body(&input.body)?;
        self.filter.check(&title).await?;
        self.filter.check(&body).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }

        let post = self
            .post_repo
            .create(author.id, input.category_id, &title, &body)
            .await?;
        self.tags.set_post_tags(post.id, &input.tags).await?;
        self.subscription_repo.subscribe(author.id, post.id).await?;

        self.audit
            .record(Some(author.id), "post_create", "post", Some(post.id), None, ip)
            .await;
        tracing::info!("Post {} created by {}", post.id, author.username);

        self.detail(post).await
    }

    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdatePostInput,
        ip: Option<&str>,
    ) -> ServiceResult<PostDetail> {
        let mut post = self.get_live(id).await?;
        if post.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can edit this post"));
        }

        if let Some(title) = &input.title {
            post.title = self.validate_title(title)?;
            self.filter.check(&post.title).await?;
        }
        if let Some(body) = &input.body {
            post.body = self.validate_body(body)?;
            self.filter.check(&post.body).await?;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
            post.category_id = Some(category_id);
        }

        let post = self.post_repo.update(&post).await?;
        if let Some(tags) = &input.tags {
            self.tags.set_post_tags(post.id, tags).await?;
        }

        self.audit
            .record(Some(user.id), "post_update", "post", Some(id), None, ip)
            .await;
        self.detail(post).await
    }

    /// Soft delete by the author or any moderator
    pub async fn delete(&self, user: &User, id: i64, ip: Option<&str>) -> ServiceResult<()> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post"))?;
        if post.is_deleted() {
            return Err(ServiceError::conflict("Post already deleted"));
        }
        if !user.can_moderate(post.author_id) {
            return Err(ServiceError::forbidden("You cannot delete this post"));
        }

        self.post_repo.soft_delete(id).await?;
        let detail = (user.id != post.author_id).then(|| format!("by {}", user.role));
        self.audit
            .record(Some(user.id), "post_delete", "post", Some(id), detail, ip)
            .await;
        Ok(())
    }

    async fn detail(&self, post: Post) -> ServiceResult<PostDetail> {
        let author = self.author_summary(post.author_id).await?;
        let tags = self.tags.names_for_post(post.id).await?;
        let comment_count = self.comment_repo.count_visible_by_post(post.id).await?;
        let (like_count, dislike_count) = self.reaction_repo.counts(TargetType::Post, post.id).await?;
        Ok(PostDetail {
            post,
            author,
            tags,
            comment_count,
            like_count,
            dislike_count,
        })
    }

    async fn author_summary(&self, author_id: i64) -> ServiceResult<UserSummary> {
        let summary = match self.user_repo.get_by_id(author_id).await? {
            Some(user) => user.summary(),
            None => UserSummary {
                id: author_id,
                username: "unknown".to_string(),
                nickname: "Unknown".to_string(),
                role: UserRole::Member,
                avatar_url: String::new(),
            },
        };
        Ok(summary)
    }

    async fn ensure_category(&self, category_id: i64) -> ServiceResult<()> {
        match self.category_repo.get_by_id(category_id).await? {
            Some(c) if !c.is_deleted() => Ok(()),
            _ => Err(ServiceError::validation("Category does not exist")),
        }
    }

    fn validate_title(&self, title: &str) -> ServiceResult<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }
        if title.chars().count() > self.title_max {
            return Err(ServiceError::Validation(format!(
                "Title must be at most {} characters",
                self.title_max
            )));
        }
        Ok(title.to_string())
    }

    fn validate_body(&self, body: &str) -> ServiceResult<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ServiceError::validation("Body cannot be empty"));
        }
        if body.chars().count() > self.body_max {
            return Err(ServiceError::Validation(format!(
                "Body must be at most {} characters",
                self.body_max
            )));
        }
        Ok(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAuditRepository, SqlxCategoryRepository, SqlxCommentRepository,
        SqlxForbiddenWordRepository, SqlxPostRepository, SqlxReactionRepository,
        SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::PostSort;
    use crate::services::test_support::{insert_user, migrated_pool};

    fn build(pool: &DynDatabasePool) -> PostService {
        let audit = Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone())));
        PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxReactionRepository::boxed(pool.clone()),
            SqlxSubscriptionRepository::boxed(pool.clone()),
            Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()), audit.clone())),
            Arc::new(ContentFilterService::new(SqlxForbiddenWordRepository::boxed(pool.clone()))),
            audit,
        )
    }

    fn input(title: &str, body: &str, tags: &[&str]) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            body: body.to_string(),
            category_id: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_subscribes_author_and_tags() {
        let pool = migrated_pool().await;
        let service = build(&pool);
        let author = insert_user(&pool, "poster", UserRole::Member).await;

        let detail = service
            .create(&author, input("  Hello  ", "First post", &["Intro", "intro"]), None)
            .await
            .expect("Create");
        assert_eq!(detail.post.title, "Hello");
        assert_eq!(detail.tags, vec!["intro"]);
        assert_eq!(detail.author.username, "poster");

        let subs = SqlxSubscriptionRepository::new(pool.clone())
            .subscriber_ids(detail.post.id)
            .await
            .expect("Subscribers");
        assert_eq!(subs, vec![author.id]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let pool = migrated_pool().await;
        let service = build(&pool);
        let author = insert_user(&pool, "poster", UserRole::Member).await;

        let empty = service.create(&author, input("  ", "body", &[]), None).await;
        assert!(matches!(empty, Err(ServiceError::Validation(_))));

        let long = service
            .create(&author, input(&"t".repeat(201), "body", &[]), None)
            .await;
        assert!(matches!(long, Err(ServiceError::Validation(_))));

        let mut bad_category = input("Title", "body", &[]);
        bad_category.category_id = Some(999);
        assert!(matches!(
            service.create(&author, bad_category, None).await,
            Err(ServiceError::Validation(_))
        ));

        ContentFilterService::new(SqlxForbiddenWordRepository::boxed(pool.clone()))
            .add("casino", None)
            .await
            .expect("Add word");
        let spam = service
            .create(&author, input("Best CASINO deals", "body", &[]), None)
            .await;
        assert!(matches!(spam, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_view_counts_and_visibility() {
        let pool = migrated_pool().await;
        let service = build(&pool);
        let author = insert_user(&pool, "poster", UserRole::Member).await;
        let created = service
            .create(&author, input("Seen", "body", &[]), None)
            .await
            .expect("Create");

        let first = service.view(created.post.id).await.expect("View");
        assert_eq!(first.post.view_count, 1);
        let second = service.view(created.post.id).await.expect("View");
        assert_eq!(second.post.view_count, 2);

        SqlxPostRepository::new(pool.clone())
            .set_hidden(created.post.id, true)
            .await
            .expect("Hide");
        assert!(matches!(
            service.view(created.post.id).await,
            Err(ServiceError::NotFound(_))
        ));
        let listed = service
            .list(&PostFilter::default(), &ListParams::default())
            .await
            .expect("List");
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let pool = migrated_pool().await;
        let service = build(&pool);
        let author = insert_user(&pool, "poster", UserRole::Member).await;
        service
            .create(&author, input("Rust tips", "ownership", &["rust"]), None)
            .await
            .expect("Create");
        service
            .create(&author, input("Gardening", "tomatoes", &["garden"]), None)
            .await
            .expect("Create");

        let by_tag = PostFilter {
            tag: Some("rust".into()),
            ..Default::default()
        };
        let page = service.list(&by_tag, &ListParams::default()).await.expect("List");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].post.title, "Rust tips");

        let search = PostFilter {
            search: Some("TOMATO".into()),
            sort: PostSort::Oldest,
            ..Default::default()
        };
        let page = service.list(&search, &ListParams::default()).await.expect("List");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].post.title, "Gardening");
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let pool = migrated_pool().await;
        let service = build(&pool);
        let author = insert_user(&pool, "poster", UserRole::Member).await;
        let other = insert_user(&pool, "other", UserRole::Member).await;
        let moderator = insert_user(&pool, "mod", UserRole::Moderator).await;
        let created = service
            .create(&author, input("Draft", "body", &["a"]), None)
            .await
            .expect("Create");
        let id = created.post.id;

        let not_yours = service
            .update(&other, id, UpdatePostInput { title: Some("Mine".into()), ..Default::default() }, None)
            .await;
        assert!(matches!(not_yours, Err(ServiceError::Forbidden(_))));

        let updated = service
            .update(
                &author,
                id,
                UpdatePostInput {
                    title: Some("Final".into()),
                    tags: Some(vec!["b".into()]),
                    ..Default::default()
                },
                None,
            )
            .await
            .expect("Update");
        assert_eq!(updated.post.title, "Final");
        assert_eq!(updated.tags, vec!["b"]);

        assert!(matches!(
            service.delete(&other, id, None).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&moderator, id, None).await.expect("Moderator delete");
        assert!(matches!(
            service.delete(&author, id, None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(service.view(id).await, Err(ServiceError::NotFound(_))));
    }
}
