//! Report service
//!
//! Members flag posts, comments or other members. A reporter can have at
//! most one open (pending or reviewing) report per target.

use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository, ReportRepository, UserRepository};
use crate::models::{
    CreateReportInput, ListParams, NotificationKind, PagedResult, Report, ReportFilter,
    ReportStatus, TargetType, UpdateReportStatusInput, User,
};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

pub const MAX_REASON_LENGTH: usize = 200;
pub const MAX_DETAILS_LENGTH: usize = 2000;

pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
    audit: Arc<AuditService>,
}

impl ReportService {
    pub fn new(
        repo: Arc<dyn ReportRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            comment_repo,
            user_repo,
            notifications,
            audit,
        }
    }

    pub async fn create(
        &self,
        reporter: &User,
        mut input: CreateReportInput,
        ip: Option<&str>,
    ) -> ServiceResult<Report> {
        input.reason = input.reason.trim().to_string();
        if input.reason.is_empty() {
            return Err(ServiceError::validation("Reason is required"));
        }
        if input.reason.chars().count() > MAX_REASON_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Reason must be at most {} characters",
                MAX_REASON_LENGTH
            )));
        }
        input.details = input
            .details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(details) = &input.details {
            if details.chars().count() > MAX_DETAILS_LENGTH {
                return Err(ServiceError::Validation(format!(
                    "Details must be at most {} characters",
                    MAX_DETAILS_LENGTH
                )));
            }
        }

        let owner_id = self.target_owner(input.target_type, input.target_id).await?;
        if owner_id == reporter.id {
            return Err(ServiceError::validation("You cannot report your own content"));
        }
        if self
            .repo
            .find_open(reporter.id, input.target_type, input.target_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(
                "You already have an open report for this target",
            ));
        }

        let report = self.repo.create(reporter.id, &input).await?;
        tracing::info!(
            "Report {} filed against {} {}",
            report.id,
            report.target_type,
            report.target_id
        );
        self.audit
            .record(Some(reporter.id), "report_create", "report", Some(report.id), None, ip)
            .await;
        Ok(report)
    }

    pub async fn list_mine(&self, reporter_id: i64) -> ServiceResult<Vec<Report>> {
        Ok(self.repo.list_by_reporter(reporter_id).await?)
    }

    pub async fn list(
        &self,
        filter: &ReportFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Report>> {
        let (items, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Report> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Report"))
    }

    /// Move a report through its workflow. Closing it stamps the moderator
    /// and time; reopening clears them. The reporter is told either way.
    pub async fn update_status(
        &self,
        moderator: &User,
        id: i64,
        input: UpdateReportStatusInput,
        ip: Option<&str>,
    ) -> ServiceResult<Report> {
        let report = self.get(id).await?;
        let note = input
            .resolution_note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let (resolved_by, resolved_at) = if input.status.is_closed() {
            (Some(moderator.id), Some(Utc::now()))
        } else {
            (None, None)
        };
        self.repo
            .update_status(id, input.status, note, resolved_by, resolved_at)
            .await?;

        if report.status != input.status {
            self.notifications
                .notify(
                    report.reporter_id,
                    NotificationKind::ReportUpdate,
                    format!("Your report #{} is now {}", report.id, input.status),
                    Some(("report", report.id)),
                    Some(moderator.id),
                )
                .await;
        }
        self.audit
            .record(
                Some(moderator.id),
                "report_status_change",
                "report",
                Some(id),
                Some(format!("{} -> {}", report.status, input.status)),
                ip,
            )
            .await;
        self.get(id).await
    }

    /// Close a report as resolved after a moderation action
    pub async fn resolve(&self, moderator: &User, id: i64, note: &str) -> ServiceResult<Report> {
        self.update_status(
            moderator,
            id,
            UpdateReportStatusInput {
                status: ReportStatus::Resolved,
                resolution_note: Some(note.to_string()),
            },
            None,
        )
        .await
    }

    /// User who owns the reported entity (the user themselves for user reports)
    async fn target_owner(&self, target_type: TargetType, target_id: i64) -> ServiceResult<i64> {
        let owner = match target_type {
            TargetType::Post => self
                .post_repo
                .get_by_id(target_id)
                .await?
                .filter(|p| !p.is_deleted())
                .map(|p| p.author_id),
            TargetType::Comment => self
                .comment_repo
                .get_by_id(target_id)
                .await?
                .filter(|c| !c.is_deleted())
                .map(|c| c.author_id),
            TargetType::User => self
                .user_repo
                .get_by_id(target_id)
                .await?
                .filter(|u| !u.is_deleted())
                .map(|u| u.id),
        };
        owner.ok_or_else(|| {
            ServiceError::NotFound(format!("Reported {} not found", target_type))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        NotificationRepository, SqlxAuditRepository, SqlxCommentRepository,
        SqlxNotificationRepository, SqlxPostRepository, SqlxReportRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::UserRole;
    use crate::services::test_support::{insert_user, migrated_pool};

    fn build(pool: &DynDatabasePool) -> ReportService {
        ReportService::new(
            SqlxReportRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            Arc::new(NotificationService::new(SqlxNotificationRepository::boxed(pool.clone()))),
            Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone()))),
        )
    }

    fn against(target_type: TargetType, target_id: i64) -> CreateReportInput {
        CreateReportInput {
            target_type,
            target_id,
            reason: "  spam  ".to_string(),
            details: Some("   ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_rules() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let reporter = insert_user(&pool, "reporter", UserRole::Member).await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(author.id, None, "Spammy", "Buy now")
            .await
            .expect("Post");
        let service = build(&pool);

        let own = service.create(&author, against(TargetType::Post, post.id), None).await;
        assert!(matches!(own, Err(ServiceError::Validation(_))));

        let missing = service.create(&reporter, against(TargetType::Comment, 404), None).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let report = service
            .create(&reporter, against(TargetType::Post, post.id), None)
            .await
            .expect("Report");
        assert_eq!(report.reason, "spam");
        assert!(report.details.is_none());
        assert_eq!(report.status, ReportStatus::Pending);

        let duplicate = service
            .create(&reporter, against(TargetType::Post, post.id), None)
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        // Reporting the member directly is a different target
        service
            .create(&reporter, against(TargetType::User, author.id), None)
            .await
            .expect("Report user");
        assert_eq!(service.list_mine(reporter.id).await.expect("Mine").len(), 2);
    }

    #[tokio::test]
    async fn test_status_workflow_notifies_reporter() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let reporter = insert_user(&pool, "reporter", UserRole::Member).await;
        let moderator = insert_user(&pool, "moddy", UserRole::Moderator).await;
        let service = build(&pool);

        let report = service
            .create(&reporter, against(TargetType::User, author.id), None)
            .await
            .expect("Report");

        let reviewing = service
            .update_status(
                &moderator,
                report.id,
                UpdateReportStatusInput {
                    status: ReportStatus::Reviewing,
                    resolution_note: None,
                },
                None,
            )
            .await
            .expect("Review");
        assert!(reviewing.resolved_at.is_none());

        let dismissed = service
            .update_status(
                &moderator,
                report.id,
                UpdateReportStatusInput {
                    status: ReportStatus::Dismissed,
                    resolution_note: Some("Not a violation".to_string()),
                },
                None,
            )
            .await
            .expect("Dismiss");
        assert_eq!(dismissed.resolved_by, Some(moderator.id));
        assert!(dismissed.resolved_at.is_some());
        assert_eq!(dismissed.resolution_note.as_deref(), Some("Not a violation"));

        let pending = service
            .list(
                &ReportFilter {
                    status: Some(ReportStatus::Pending),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .expect("List");
        assert_eq!(pending.total, 0);

        let inbox = SqlxNotificationRepository::new(pool.clone())
            .list(reporter.id, false, &ListParams::default())
            .await
            .expect("Inbox");
        assert_eq!(inbox.0.len(), 2);
        assert!(inbox.0.iter().all(|n| n.kind == NotificationKind::ReportUpdate));

        // A closed report no longer blocks a new one
        service
            .create(&reporter, against(TargetType::User, author.id), None)
            .await
            .expect("Report again");
    }
}
