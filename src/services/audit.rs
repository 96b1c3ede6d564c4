//! Audit trail
//!
//! Recording an entry never fails the caller: a failed insert is logged and
//! swallowed so the action being audited still completes.

use std::sync::Arc;

use crate::db::repositories::AuditRepository;
use crate::models::{AuditFilter, AuditLog, ListParams, NewAuditLog, PagedResult};

use super::error::ServiceResult;

pub struct AuditService {
    repo: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        actor_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        detail: Option<String>,
        ip_address: Option<&str>,
    ) {
        let entry = NewAuditLog {
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            detail,
            ip_address: ip_address.map(str::to_string),
        };
        if let Err(e) = self.repo.create(&entry).await {
            tracing::warn!("Failed to write audit log '{}': {:#}", action, e);
        }
    }

    pub async fn list(
        &self,
        filter: &AuditFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<AuditLog>> {
        let (items, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxAuditRepository;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_record_and_filter() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool).await.expect("Failed to migrate");
        let service = AuditService::new(SqlxAuditRepository::boxed(pool));

        service
            .record(None, "login_failed", "user", None, Some("bob".into()), Some("10.0.0.1"))
            .await;
        service
            .record(None, "comment_delete", "comment", Some(4), None, None)
            .await;

        let all = service
            .list(&AuditFilter::default(), &ListParams::default())
            .await
            .expect("Failed to list");
        assert_eq!(all.total, 2);

        let filter = AuditFilter {
            action: Some("login_failed".into()),
            ..Default::default()
        };
        let page = service
            .list(&filter, &ListParams::default())
            .await
            .expect("Failed to list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_record_swallows_failures() {
        // No migrations: the insert fails, the call still returns.
        let pool = create_test_pool().await.expect("Failed to create pool");
        let service = AuditService::new(SqlxAuditRepository::boxed(pool));
        service.record(Some(1), "noop", "user", Some(1), None, None).await;
    }
}
