//! Comment service
//!
//! Threaded comments under a post. Rules for members:
//! - content length is bounded and must not contain a forbidden word
//! - a reply sits one level below its parent, up to the configured depth
//! - only the author may delete, within the delete window, and only once

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{BoardConfig, MAX_DELETE_WINDOW_MINUTES};
use crate::db::repositories::{
    CommentRepository, PostRepository, ReactionRepository, SubscriptionRepository, UserRepository,
};
use crate::models::{
    Comment, CommentNode, CreateCommentInput, NotificationKind, Post, TargetType,
    UpdateCommentInput, User, UserSummary,
};

use super::audit::AuditService;
use super::content_filter::ContentFilterService;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    reaction_repo: Arc<dyn ReactionRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    filter: Arc<ContentFilterService>,
    notifications: Arc<NotificationService>,
    audit: Arc<AuditService>,
    rules: BoardConfig,
}

impl CommentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        reaction_repo: Arc<dyn ReactionRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        filter: Arc<ContentFilterService>,
        notifications: Arc<NotificationService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            reaction_repo,
            subscription_repo,
            filter,
            notifications,
            audit,
            rules: BoardConfig::default(),
        }
    }

    pub fn with_rules(mut self, rules: BoardConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Comment tree for a visible post.
    ///
    /// A deleted comment is kept as an empty placeholder only while some
    /// reply below it is still shown.
    pub async fn list_for_post(&self, post_id: i64) -> ServiceResult<Vec<CommentNode>> {
        self.visible_post(post_id).await?;
        let comments = self.comment_repo.list_by_post(post_id).await?;

        let mut authors: HashMap<i64, UserSummary> = HashMap::new();
        let mut likes: HashMap<i64, i64> = HashMap::new();
        for comment in &comments {
            if comment.is_deleted() {
                continue;
            }
            if !authors.contains_key(&comment.author_id) {
                if let Some(user) = self.user_repo.get_by_id(comment.author_id).await? {
                    authors.insert(user.id, user.summary());
                }
            }
            let (like_count, _) = self
                .reaction_repo
                .counts(TargetType::Comment, comment.id)
                .await?;
            likes.insert(comment.id, like_count);
        }

        Ok(build_tree(&comments, &authors, &likes))
    }

    pub async fn create(
        &self,
        user: &User,
        post_id: i64,
        input: CreateCommentInput,
        ip: Option<&str>,
    ) -> ServiceResult<CommentNode> {
        let post = self.visible_post(post_id).await?;
        if post.is_locked {
            return Err(ServiceError::forbidden("Post is locked"));
        }

        let content = self.validate_content(&input.content)?;
        self.filter.check(&content).await?;

        let (parent, depth) = match input.parent_id {
            Some(parent_id) => {
                let parent = self
                    .comment_repo
                    .get_by_id(parent_id)
                    .await?
                    .filter(|c| c.post_id == post_id)
                    .ok_or_else(|| ServiceError::validation("Parent comment not found"))?;
                if parent.is_deleted() {
                    return Err(ServiceError::validation("Cannot reply to a deleted comment"));
                }
                let depth = parent.depth + 1;
                if depth > self.rules.max_comment_depth {
                    return Err(ServiceError::Validation(format!(
                        "Replies cannot be nested more than {} levels deep",
                        self.rules.max_comment_depth
                    )));
                }
                (Some(parent), depth)
            }
            None => (None, 0),
        };

        let comment = self
            .comment_repo
            .create(post_id, user.id, input.parent_id, &content, depth)
            .await?;

        self.notify_new_comment(user, &post, parent.as_ref(), &comment)
            .await?;
        self.audit
            .record(Some(user.id), "comment_create", "comment", Some(comment.id), None, ip)
            .await;

        Ok(node(&comment, Some(user.summary()), 0))
    }

    pub async fn update(
        &self,
        user: &User,
        post_id: i64,
        comment_id: i64,
        input: UpdateCommentInput,
    ) -> ServiceResult<CommentNode> {
        let comment = self.comment_in_post(post_id, comment_id).await?;
        if comment.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can edit this comment"));
        }
        if comment.is_deleted() {
            return Err(ServiceError::conflict("Comment already deleted"));
        }

        let content = self.validate_content(&input.content)?;
        self.filter.check(&content).await?;
        if !self.comment_repo.update_content(comment_id, &content).await? {
            return Err(ServiceError::conflict("Comment already deleted"));
        }

        let updated = self.comment_in_post(post_id, comment_id).await?;
        let (like_count, _) = self
            .reaction_repo
            .counts(TargetType::Comment, comment_id)
            .await?;
        Ok(node(&updated, Some(user.summary()), like_count))
    }

    /// Author-only soft delete inside the delete window
    pub async fn delete(
        &self,
        user: &User,
        post_id: i64,
        comment_id: i64,
        ip: Option<&str>,
    ) -> ServiceResult<()> {
        let comment = self.comment_in_post(post_id, comment_id).await?;
        if comment.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can delete this comment"));
        }
        if comment.is_deleted() {
            return Err(ServiceError::conflict("Comment already deleted"));
        }
        let window = Duration::minutes(
            self.rules
                .comment_delete_window_minutes
                .clamp(1, MAX_DELETE_WINDOW_MINUTES),
        );
        if Utc::now() - comment.created_at > window {
            return Err(ServiceError::Forbidden(format!(
                "Comments can only be deleted within {} minutes of posting",
                self.rules.comment_delete_window_minutes
            )));
        }

        if !self.comment_repo.soft_delete(comment_id).await? {
            return Err(ServiceError::conflict("Comment already deleted"));
        }
        self.audit
            .record(Some(user.id), "comment_delete", "comment", Some(comment_id), None, ip)
            .await;
        Ok(())
    }

    async fn visible_post(&self, post_id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(post_id)
            .await?
            .filter(Post::is_visible)
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    async fn comment_in_post(&self, post_id: i64, comment_id: i64) -> ServiceResult<Comment> {
        self.comment_repo
            .get_by_id(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| ServiceError::not_found("Comment"))
    }

    fn validate_content(&self, content: &str) -> ServiceResult<String> {
        let content = content.trim();
        let len = content.chars().count();
        if len < self.rules.comment_min_length.max(1) || len > self.rules.comment_max_length {
            return Err(ServiceError::Validation(format!(
                "Comment must be between {} and {} characters",
                self.rules.comment_min_length.max(1),
                self.rules.comment_max_length
            )));
        }
        Ok(content.to_string())
    }

    /// Tell the parent's author, the post's author and subscribers. Each
    /// person hears once; the commenter never hears about their own comment.
    async fn notify_new_comment(
        &self,
        commenter: &User,
        post: &Post,
        parent: Option<&Comment>,
        comment: &Comment,
    ) -> ServiceResult<()> {
        let mut recipients: Vec<(i64, NotificationKind)> = Vec::new();
        if let Some(parent) = parent {
            recipients.push((parent.author_id, NotificationKind::CommentReply));
        }
        recipients.push((post.author_id, NotificationKind::PostComment));
        for id in self.subscription_repo.subscriber_ids(post.id).await? {
            recipients.push((id, NotificationKind::SubscribedPost));
        }

        let mut notified = Vec::new();
        for (user_id, kind) in recipients {
            if user_id == commenter.id || notified.contains(&user_id) {
                continue;
            }
            notified.push(user_id);
            let message = match kind {
                NotificationKind::CommentReply => {
                    format!("{} replied to your comment on \"{}\"", commenter.nickname, post.title)
                }
                NotificationKind::PostComment => {
                    format!("{} commented on your post \"{}\"", commenter.nickname, post.title)
                }
                _ => format!("New comment on \"{}\"", post.title),
            };
            self.notifications
                .notify(user_id, kind, message, Some(("comment", comment.id)), Some(commenter.id))
                .await;
        }
        Ok(())
    }
}

fn node(comment: &Comment, author: Option<UserSummary>, like_count: i64) -> CommentNode {
    let deleted = comment.is_deleted();
    CommentNode {
        id: comment.id,
        post_id: comment.post_id,
        parent_id: comment.parent_id,
        depth: comment.depth,
        content: (!deleted).then(|| comment.content.clone()),
        author: if deleted { None } else { author },
        is_deleted: deleted,
        like_count: if deleted { 0 } else { like_count },
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        replies: Vec::new(),
    }
}

/// Assemble the reply tree from comments in creation order
fn build_tree(
    comments: &[Comment],
    authors: &HashMap<i64, UserSummary>,
    likes: &HashMap<i64, i64>,
) -> Vec<CommentNode> {
    let mut children: HashMap<Option<i64>, Vec<&Comment>> = HashMap::new();
    for comment in comments {
        children.entry(comment.parent_id).or_default().push(comment);
    }

    fn build(
        comment: &Comment,
        children: &HashMap<Option<i64>, Vec<&Comment>>,
        authors: &HashMap<i64, UserSummary>,
        likes: &HashMap<i64, i64>,
    ) -> Option<CommentNode> {
        let replies: Vec<CommentNode> = children
            .get(&Some(comment.id))
            .map(|kids| {
                kids.iter()
                    .filter_map(|c| build(c, children, authors, likes))
                    .collect()
            })
            .unwrap_or_default();

        if comment.is_deleted() && replies.is_empty() {
            return None;
        }
        let mut n = node(
            comment,
            authors.get(&comment.author_id).cloned(),
            likes.get(&comment.id).copied().unwrap_or(0),
        );
        n.replies = replies;
        Some(n)
    }

    children
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .filter_map(|c| build(c, &children, authors, likes))
                .collect()
        })
        .unwrap_or_default()
}
