//! Moderation service
//!
//! Moderators act on posts, comments and members. Every action is recorded,
//! closes the report that prompted it, tells the affected member and lands
//! in the audit log.

use std::sync::Arc;

use crate::db::repositories::{
    CommentRepository, ModerationRepository, NewModerationAction, PostRepository,
    SessionRepository, UserRepository,
};
use crate::models::{
    ApplyModerationInput, ListParams, ModerationAction, ModerationActionKind, ModerationFilter,
    NotificationKind, PagedResult, Report, TargetType, User, UserRole, UserStatus,
};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;
use super::report::ReportService;

pub const MAX_REASON_LENGTH: usize = 500;

pub struct ModerationService {
    repo: Arc<dyn ModerationRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    reports: Arc<ReportService>,
    notifications: Arc<NotificationService>,
    audit: Arc<AuditService>,
}

impl ModerationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn ModerationRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        reports: Arc<ReportService>,
        notifications: Arc<NotificationService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            comment_repo,
            user_repo,
            session_repo,
            reports,
            notifications,
            audit,
        }
    }

    pub async fn apply(
        &self,
        moderator: &User,
        input: ApplyModerationInput,
        ip: Option<&str>,
    ) -> ServiceResult<ModerationAction> {
        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::validation("Reason is required"));
        }
        if reason.chars().count() > MAX_REASON_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Reason must be at most {} characters",
                MAX_REASON_LENGTH
            )));
        }

        let report = match input.report_id {
            Some(report_id) => {
                let report = self.reports.get(report_id).await?;
                if report.status.is_closed() {
                    return Err(ServiceError::conflict("Report is already closed"));
                }
                Some(report)
            }
            None => None,
        };

        let target_user = self.affected_user(input.action, input.target_id).await?;
        check_authority(moderator, &target_user, input.action)?;

        if let Some(report) = &report {
            if !self
                .report_concerns(report, input.action, input.target_id, &target_user)
                .await?
            {
                return Err(ServiceError::validation(
                    "The linked report is about a different target",
                ));
            }
        }

        self.apply_effect(input.action, input.target_id, &target_user)
            .await?;

        let action = self
            .repo
            .create(&NewModerationAction {
                moderator_id: moderator.id,
                action: input.action,
                target_id: input.target_id,
                target_user_id: Some(target_user.id),
                reason: reason.clone(),
                report_id: input.report_id,
            })
            .await?;
        tracing::info!(
            "Moderator {} applied {} to {} {}",
            moderator.id,
            action.action,
            action.target_type,
            action.target_id
        );

        if let Some(report_id) = input.report_id {
            self.reports
                .resolve(moderator, report_id, &format!("Action taken: {}", action.action))
                .await?;
        }

        if target_user.id != moderator.id {
            self.notifications
                .notify(
                    target_user.id,
                    NotificationKind::Moderation,
                    notice(input.action, &reason),
                    Some((action.target_type.as_str(), action.target_id)),
                    Some(moderator.id),
                )
                .await;
        }
        self.audit
            .record(
                Some(moderator.id),
                &format!("moderation_{}", action.action),
                action.target_type.as_str(),
                Some(action.target_id),
                Some(reason),
                ip,
            )
            .await;

        Ok(action)
    }

    pub async fn list(
        &self,
        filter: &ModerationFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<ModerationAction>> {
        let (items, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Owner of the targeted content, or the targeted member
    async fn affected_user(&self, action: ModerationActionKind, target_id: i64) -> ServiceResult<User> {
        let user_id = match action.target_type() {
            TargetType::Post => {
                let post = self
                    .post_repo
                    .get_by_id(target_id)
                    .await?
                    .filter(|p| !p.is_deleted())
                    .ok_or_else(|| ServiceError::not_found("Post"))?;
                post.author_id
            }
            TargetType::Comment => {
                let comment = self
                    .comment_repo
                    .get_by_id(target_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Comment"))?;
                match (action, comment.is_deleted()) {
                    (ModerationActionKind::DeleteComment, true) => {
                        return Err(ServiceError::conflict("Comment already deleted"));
                    }
                    (ModerationActionKind::RestoreComment, false) => {
                        return Err(ServiceError::conflict("Comment is not deleted"));
                    }
                    _ => {}
                }
                comment.author_id
            }
            TargetType::User => target_id,
        };

        self.user_repo
            .get_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// A linked report must name the action's target. Actions on a member
    /// also accept reports about a post or comment that member wrote.
    async fn report_concerns(
        &self,
        report: &Report,
        action: ModerationActionKind,
        target_id: i64,
        target_user: &User,
    ) -> ServiceResult<bool> {
        if report.target_type == action.target_type() && report.target_id == target_id {
            return Ok(true);
        }
        if action.target_type() != TargetType::User {
            return Ok(false);
        }
        let author_id = match report.target_type {
            TargetType::Post => self
                .post_repo
                .get_by_id(report.target_id)
                .await?
                .map(|p| p.author_id),
            TargetType::Comment => self
                .comment_repo
                .get_by_id(report.target_id)
                .await?
                .map(|c| c.author_id),
            TargetType::User => None,
        };
        Ok(author_id == Some(target_user.id))
    }

    async fn apply_effect(
        &self,
        action: ModerationActionKind,
        target_id: i64,
        target_user: &User,
    ) -> ServiceResult<()> {
        match action {
            ModerationActionKind::HidePost => {
                self.post_repo.set_hidden(target_id, true).await?;
            }
            ModerationActionKind::RestorePost => {
                self.post_repo.set_hidden(target_id, false).await?;
            }
            ModerationActionKind::LockPost => {
                self.post_repo.set_locked(target_id, true).await?;
            }
            ModerationActionKind::UnlockPost => {
                self.post_repo.set_locked(target_id, false).await?;
            }
            ModerationActionKind::DeleteComment => {
                self.comment_repo.soft_delete(target_id).await?;
            }
            ModerationActionKind::RestoreComment => {
                self.comment_repo.restore(target_id).await?;
            }
            ModerationActionKind::WarnUser => {}
            ModerationActionKind::SuspendUser => {
                self.user_repo
                    .update_status(target_user.id, UserStatus::Suspended)
                    .await?;
                let revoked = self.session_repo.delete_by_user(target_user.id).await?;
                tracing::info!("Suspended user {}, revoked {} sessions", target_user.id, revoked);
            }
            ModerationActionKind::UnsuspendUser => {
                self.user_repo
                    .update_status(target_user.id, UserStatus::Active)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Staff may not act on administrators unless they are one, and only
/// administrators may suspend other staff.
fn check_authority(
    moderator: &User,
    target: &User,
    action: ModerationActionKind,
) -> ServiceResult<()> {
    if target.is_admin() && !moderator.is_admin() {
        return Err(ServiceError::forbidden(
            "Moderators cannot act on administrators",
        ));
    }
    if action.target_type() == TargetType::User && target.id == moderator.id {
        return Err(ServiceError::forbidden("You cannot moderate your own account"));
    }
    if matches!(
        action,
        ModerationActionKind::SuspendUser | ModerationActionKind::UnsuspendUser
    ) && target.role >= UserRole::Moderator
        && !moderator.is_admin()
    {
        return Err(ServiceError::forbidden(
            "Only administrators can suspend moderators",
        ));
    }
    Ok(())
}

fn notice(action: ModerationActionKind, reason: &str) -> String {
    let what = match action {
        ModerationActionKind::HidePost => "Your post was hidden",
        ModerationActionKind::RestorePost => "Your post was restored",
        ModerationActionKind::LockPost => "Your post was locked",
        ModerationActionKind::UnlockPost => "Your post was unlocked",
        ModerationActionKind::DeleteComment => "Your comment was removed",
        ModerationActionKind::RestoreComment => "Your comment was restored",
        ModerationActionKind::WarnUser => "You received a warning",
        ModerationActionKind::SuspendUser => "Your account was suspended",
        ModerationActionKind::UnsuspendUser => "Your account was reinstated",
    };
    format!("{}: {}", what, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        NotificationRepository, ReportRepository, SqlxAuditRepository, SqlxCommentRepository,
        SqlxModerationRepository, SqlxNotificationRepository, SqlxPostRepository,
        SqlxReportRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{CreateReportInput, ReportStatus};
    use crate::services::test_support::{insert_user, migrated_pool};

    fn build(pool: &DynDatabasePool) -> ModerationService {
        let notifications = Arc::new(NotificationService::new(SqlxNotificationRepository::boxed(
            pool.clone(),
        )));
        let audit = Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone())));
        let reports = Arc::new(ReportService::new(
            SqlxReportRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            notifications.clone(),
            audit.clone(),
        ));
        ModerationService::new(
            SqlxModerationRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            reports,
            notifications,
            audit,
        )
    }

    fn act(action: ModerationActionKind, target_id: i64) -> ApplyModerationInput {
        ApplyModerationInput {
            action,
            target_id,
            reason: "Off topic".to_string(),
            report_id: None,
        }
    }

    #[tokio::test]
    async fn test_hide_post_resolves_report_and_notifies() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let reporter = insert_user(&pool, "reporter", UserRole::Member).await;
        let moderator = insert_user(&pool, "moddy", UserRole::Moderator).await;
        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts.create(author.id, None, "Spam", "Buy").await.expect("Post");
        let report = SqlxReportRepository::new(pool.clone())
            .create(
                reporter.id,
                &CreateReportInput {
                    target_type: TargetType::Post,
                    target_id: post.id,
                    reason: "spam".to_string(),
                    details: None,
                },
            )
            .await
            .expect("Report");
        let service = build(&pool);

        let mut input = act(ModerationActionKind::HidePost, post.id);
        input.report_id = Some(report.id);
        let action = service.apply(&moderator, input.clone(), None).await.expect("Hide");
        assert_eq!(action.target_type, TargetType::Post);
        assert_eq!(action.target_user_id, Some(author.id));

        let hidden = posts.get_by_id(post.id).await.expect("Get").expect("Post");
        assert!(hidden.is_hidden);

        let closed = SqlxReportRepository::new(pool.clone())
            .get_by_id(report.id)
            .await
            .expect("Get")
            .expect("Report");
        assert_eq!(closed.status, ReportStatus::Resolved);
        assert_eq!(closed.resolved_by, Some(moderator.id));

        // The same report cannot drive a second action
        let again = service.apply(&moderator, input, None).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));

        let (inbox, _) = SqlxNotificationRepository::new(pool.clone())
            .list(author.id, false, &ListParams::default())
            .await
            .expect("Inbox");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Moderation);

        let listed = service
            .list(
                &ModerationFilter {
                    target_user_id: Some(author.id),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .expect("List");
        assert_eq!(listed.total, 1);
    }

    async fn report_on(pool: &DynDatabasePool, reporter: i64, target_type: TargetType, target_id: i64) -> i64 {
        SqlxReportRepository::new(pool.clone())
            .create(
                reporter,
                &CreateReportInput {
                    target_type,
                    target_id,
                    reason: "abuse".to_string(),
                    details: None,
                },
            )
            .await
            .expect("Report")
            .id
    }

    #[tokio::test]
    async fn test_linked_report_must_match_target() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let bystander = insert_user(&pool, "bystander", UserRole::Member).await;
        let reporter = insert_user(&pool, "reporter", UserRole::Member).await;
        let moderator = insert_user(&pool, "moddy", UserRole::Moderator).await;
        let posts = SqlxPostRepository::new(pool.clone());
        let reported = posts.create(author.id, None, "Spam", "Buy").await.expect("Post");
        let innocent = posts.create(bystander.id, None, "Fine", "Hello").await.expect("Post");
        let report_id = report_on(&pool, reporter.id, TargetType::Post, reported.id).await;
        let service = build(&pool);

        let mut input = act(ModerationActionKind::HidePost, innocent.id);
        input.report_id = Some(report_id);
        let mismatched = service.apply(&moderator, input, None).await;
        assert!(matches!(mismatched, Err(ServiceError::Validation(_))));

        let untouched = posts.get_by_id(innocent.id).await.expect("Get").expect("Post");
        assert!(!untouched.is_hidden);
        let reports = SqlxReportRepository::new(pool.clone());
        let open = reports.get_by_id(report_id).await.expect("Get").expect("Report");
        assert_eq!(open.status, ReportStatus::Pending);

        // Suspending someone else does not settle a report about the author's post
        let mut input = act(ModerationActionKind::WarnUser, bystander.id);
        input.report_id = Some(report_id);
        assert!(matches!(
            service.apply(&moderator, input, None).await,
            Err(ServiceError::Validation(_))
        ));

        // Warning the author does
        let mut input = act(ModerationActionKind::WarnUser, author.id);
        input.report_id = Some(report_id);
        service.apply(&moderator, input, None).await.expect("Warn author");
        let closed = reports.get_by_id(report_id).await.expect("Get").expect("Report");
        assert_eq!(closed.status, ReportStatus::Resolved);
    }

    #[tokio::test]
    async fn test_authority_rules() {
        let pool = migrated_pool().await;
        let admin = insert_user(&pool, "admin", UserRole::Administrator).await;
        let moderator = insert_user(&pool, "moddy", UserRole::Moderator).await;
        let other_mod = insert_user(&pool, "moddy2", UserRole::Moderator).await;
        let service = build(&pool);

        let on_admin = service
            .apply(&moderator, act(ModerationActionKind::WarnUser, admin.id), None)
            .await;
        assert!(matches!(on_admin, Err(ServiceError::Forbidden(_))));

        let suspend_mod = service
            .apply(&moderator, act(ModerationActionKind::SuspendUser, other_mod.id), None)
            .await;
        assert!(matches!(suspend_mod, Err(ServiceError::Forbidden(_))));

        let own = service
            .apply(&moderator, act(ModerationActionKind::WarnUser, moderator.id), None)
            .await;
        assert!(matches!(own, Err(ServiceError::Forbidden(_))));

        service
            .apply(&admin, act(ModerationActionKind::SuspendUser, other_mod.id), None)
            .await
            .expect("Admin suspends moderator");
        let suspended = SqlxUserRepository::new(pool.clone())
            .get_by_id(other_mod.id)
            .await
            .expect("Get")
            .expect("User");
        assert!(suspended.is_suspended());

        let blank = ApplyModerationInput {
            reason: "   ".to_string(),
            ..act(ModerationActionKind::WarnUser, other_mod.id)
        };
        assert!(matches!(
            service.apply(&admin, blank, None).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_delete_and_restore() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author", UserRole::Member).await;
        let moderator = insert_user(&pool, "moddy", UserRole::Moderator).await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(author.id, None, "Thread", "Body")
            .await
            .expect("Post");
        let comments = SqlxCommentRepository::new(pool.clone());
        let comment = comments
            .create(post.id, author.id, None, "rude words", 0)
            .await
            .expect("Comment");
        let service = build(&pool);

        let restore_live = service
            .apply(&moderator, act(ModerationActionKind::RestoreComment, comment.id), None)
            .await;
        assert!(matches!(restore_live, Err(ServiceError::Conflict(_))));

        service
            .apply(&moderator, act(ModerationActionKind::DeleteComment, comment.id), None)
            .await
            .expect("Delete");
        let deleted = comments.get_by_id(comment.id).await.expect("Get").expect("Comment");
        assert!(deleted.is_deleted());

        service
            .apply(&moderator, act(ModerationActionKind::RestoreComment, comment.id), None)
            .await
            .expect("Restore");
        let restored = comments.get_by_id(comment.id).await.expect("Get").expect("Comment");
        assert!(!restored.is_deleted());
    }
}
