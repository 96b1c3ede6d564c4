//! Like/dislike reactions on posts and comments

use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository, ReactionRepository};
use crate::models::{Post, ReactInput, ReactionSummary, ReactionTarget, TargetType};

use super::error::{ServiceError, ServiceResult};

pub struct ReactionService {
    repo: Arc<dyn ReactionRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl ReactionService {
    pub fn new(
        repo: Arc<dyn ReactionRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            comment_repo,
        }
    }

    /// Set the caller's reaction, replacing any previous one
    pub async fn react(&self, user_id: i64, input: ReactInput) -> ServiceResult<ReactionSummary> {
        self.ensure_target(input.target_type, input.target_id).await?;
        self.repo
            .upsert(user_id, input.target_type, input.target_id, input.kind)
            .await?;
        self.summary(input.target_type, input.target_id, Some(user_id))
            .await
    }

    pub async fn unreact(
        &self,
        user_id: i64,
        target: ReactionTarget,
    ) -> ServiceResult<ReactionSummary> {
        self.ensure_target(target.target_type, target.target_id).await?;
        if !self
            .repo
            .delete(user_id, target.target_type, target.target_id)
            .await?
        {
            return Err(ServiceError::not_found("Reaction"));
        }
        self.summary(target.target_type, target.target_id, Some(user_id))
            .await
    }

    /// Counts for a target, plus the viewer's own reaction when known
    pub async fn summary(
        &self,
        target_type: TargetType,
        target_id: i64,
        viewer_id: Option<i64>,
    ) -> ServiceResult<ReactionSummary> {
        let (likes, dislikes) = self.repo.counts(target_type, target_id).await?;
        let my_reaction = match viewer_id {
            Some(user_id) => self
                .repo
                .get_for_user(user_id, target_type, target_id)
                .await?
                .map(|r| r.kind),
            None => None,
        };
        Ok(ReactionSummary {
            target_type,
            target_id,
            likes,
            dislikes,
            my_reaction,
        })
    }

    /// Summary for a visible post
    pub async fn post_summary(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> ServiceResult<ReactionSummary> {
        self.ensure_target(TargetType::Post, post_id).await?;
        self.summary(TargetType::Post, post_id, viewer_id).await
    }

    async fn ensure_target(&self, target_type: TargetType, target_id: i64) -> ServiceResult<()> {
        match target_type {
            TargetType::Post => {
                self.post_repo
                    .get_by_id(target_id)
                    .await?
                    .filter(Post::is_visible)
                    .ok_or_else(|| ServiceError::not_found("Post"))?;
            }
            TargetType::Comment => {
                let comment = self
                    .comment_repo
                    .get_by_id(target_id)
                    .await?
                    .filter(|c| !c.is_deleted())
                    .ok_or_else(|| ServiceError::not_found("Comment"))?;
                self.post_repo
                    .get_by_id(comment.post_id)
                    .await?
                    .filter(Post::is_visible)
                    .ok_or_else(|| ServiceError::not_found("Comment"))?;
            }
            TargetType::User => {
                return Err(ServiceError::validation(
                    "Only posts and comments can receive reactions",
                ));
            }
        }
        Ok(())
    }
}
