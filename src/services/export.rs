//! Personal data export
//!
//! Members download everything the board holds about them; administrators
//! can pull the same bundle for any account. Every export is logged.

use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{
    CommentRepository, ExportLogRepository, PostRepository, ReactionRepository, ReportRepository,
    SubscriptionRepository, UserRepository,
};
use crate::models::{ExportLog, ListParams, PagedResult, User, UserDataExport};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};

const EXPORT_FORMAT: &str = "json";

pub struct ExportService {
    repo: Arc<dyn ExportLogRepository>,
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    report_repo: Arc<dyn ReportRepository>,
    reaction_repo: Arc<dyn ReactionRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    audit: Arc<AuditService>,
}

impl ExportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn ExportLogRepository>,
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        report_repo: Arc<dyn ReportRepository>,
        reaction_repo: Arc<dyn ReactionRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            post_repo,
            comment_repo,
            report_repo,
            reaction_repo,
            subscription_repo,
            audit,
        }
    }

    pub async fn export_user(
        &self,
        requester: &User,
        subject_id: i64,
        ip: Option<&str>,
    ) -> ServiceResult<UserDataExport> {
        if requester.id != subject_id && !requester.is_admin() {
            return Err(ServiceError::forbidden("You can only export your own data"));
        }
        let profile = self
            .user_repo
            .get_by_id(subject_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let export = UserDataExport {
            generated_at: Utc::now(),
            posts: self.post_repo.list_by_author(subject_id).await?,
            comments: self.comment_repo.list_by_author(subject_id).await?,
            reports: self.report_repo.list_by_reporter(subject_id).await?,
            reactions: self.reaction_repo.list_by_user(subject_id).await?,
            subscriptions: self.subscription_repo.list_by_user(subject_id).await?,
            profile,
        };

        self.repo
            .create(requester.id, subject_id, EXPORT_FORMAT, ip)
            .await?;
        self.audit
            .record(Some(requester.id), "user_export", "user", Some(subject_id), None, ip)
            .await;
        tracing::info!("User {} exported data of user {}", requester.id, subject_id);
        Ok(export)
    }

    pub async fn list_logs(
        &self,
        subject_id: Option<i64>,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<ExportLog>> {
        let (items, total) = self.repo.list(subject_id, params).await?;
        Ok(PagedResult::new(items, total, params))
    }
}
