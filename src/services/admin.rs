//! Administrator account management
//!
//! Role and status changes, manual verification and account removal.
//! Every change is audited; suspensions and deletions end the target's
//! sessions immediately.

use std::sync::Arc;

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, User, UserFilter, UserRole, UserStatus};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};

pub struct AdminService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    audit: Arc<AuditService>,
}

impl AdminService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            audit,
        }
    }

    pub async fn list_users(
        &self,
        filter: &UserFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<User>> {
        let (items, total) = self.user_repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get_user(&self, id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn change_role(
        &self,
        admin: &User,
        user_id: i64,
        role: UserRole,
        ip: Option<&str>,
    ) -> ServiceResult<User> {
        let target = self.get_user(user_id).await?;
        if target.role == role {
            return Ok(target);
        }
        if target.is_admin() {
            if target.id == admin.id {
                return Err(ServiceError::forbidden("You cannot change your own role"));
            }
            if self.user_repo.count_by_role(UserRole::Administrator).await? <= 1 {
                return Err(ServiceError::conflict("Cannot demote the last administrator"));
            }
        }

        self.user_repo.update_role(user_id, role).await?;
        self.audit
            .record(
                Some(admin.id),
                "user_role_change",
                "user",
                Some(user_id),
                Some(format!("{} -> {}", target.role, role)),
                ip,
            )
            .await;
        tracing::info!("{} changed role of user {} to {}", admin.username, user_id, role);

        self.get_user(user_id).await
    }

    pub async fn change_status(
        &self,
        admin: &User,
        user_id: i64,
        status: UserStatus,
        ip: Option<&str>,
    ) -> ServiceResult<User> {
        let target = self.get_user(user_id).await?;
        if target.id == admin.id && status == UserStatus::Suspended {
            return Err(ServiceError::forbidden("You cannot suspend yourself"));
        }
        if target.status == status {
            return Ok(target);
        }

        self.user_repo.update_status(user_id, status).await?;
        if status == UserStatus::Suspended {
            let revoked = self.session_repo.delete_by_user(user_id).await?;
            tracing::info!("Suspended user {}; revoked {} sessions", user_id, revoked);
        }
        self.audit
            .record(
                Some(admin.id),
                "user_status_change",
                "user",
                Some(user_id),
                Some(format!("{} -> {}", target.status, status)),
                ip,
            )
            .await;

        self.get_user(user_id).await
    }

    /// Mark an account's email as verified without a code
    pub async fn verify_email(&self, admin: &User, user_id: i64, ip: Option<&str>) -> ServiceResult<User> {
        let target = self.get_user(user_id).await?;
        if !target.email_verified {
            self.user_repo.set_email_verified(user_id, true).await?;
            self.audit
                .record(Some(admin.id), "user_verify", "user", Some(user_id), None, ip)
                .await;
        }
        self.get_user(user_id).await
    }

    pub async fn delete_user(&self, admin: &User, user_id: i64, ip: Option<&str>) -> ServiceResult<()> {
        if user_id == admin.id {
            return Err(ServiceError::forbidden("You cannot delete your own account"));
        }
        let target = self.get_user(user_id).await?;
        if target.is_admin() && self.user_repo.count_by_role(UserRole::Administrator).await? <= 1 {
            return Err(ServiceError::conflict("Cannot delete the last administrator"));
        }

        if !self.user_repo.soft_delete(user_id).await? {
            return Err(ServiceError::not_found("User"));
        }
        self.session_repo.delete_by_user(user_id).await?;
        self.audit
            .record(
                Some(admin.id),
                "user_delete",
                "user",
                Some(user_id),
                Some(target.username.clone()),
                ip,
            )
            .await;
        tracing::info!("{} deleted user {}", admin.username, target.username);
        Ok(())
    }
}
