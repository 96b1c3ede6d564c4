//! Audit log repository

use crate::db::DynDatabasePool;
use crate::models::{AuditFilter, AuditLog, ListParams, NewAuditLog};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

const AUDIT_COLUMNS: &str =
    "id, actor_id, action, entity_type, entity_id, detail, ip_address, created_at";

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog>;

    async fn list(&self, filter: &AuditFilter, params: &ListParams) -> Result<(Vec<AuditLog>, i64)>;
}

pub struct SqlxAuditRepository {
    pool: DynDatabasePool,
}

impl SqlxAuditRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuditRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuditRepository for SqlxAuditRepository {
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, detail, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.detail)
        .bind(&entry.ip_address)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to write audit log")?;

        Ok(AuditLog {
            id: result.last_insert_rowid(),
            actor_id: entry.actor_id,
            action: entry.action.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            detail: entry.detail.clone(),
            ip_address: entry.ip_address.clone(),
            created_at: now,
        })
    }

    async fn list(&self, filter: &AuditFilter, params: &ListParams) -> Result<(Vec<AuditLog>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE 1 = 1");
        push_audit_filter(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count audit logs")?;

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM audit_logs WHERE 1 = 1", AUDIT_COLUMNS));
        push_audit_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list audit logs")?;

        let logs = rows
            .iter()
            .map(|row| AuditLog {
                id: row.get("id"),
                actor_id: row.get("actor_id"),
                action: row.get("action"),
                entity_type: row.get("entity_type"),
                entity_id: row.get("entity_id"),
                detail: row.get("detail"),
                ip_address: row.get("ip_address"),
                created_at: row.get("created_at"),
            })
            .collect();
        Ok((logs, total))
    }
}

fn push_audit_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    if let Some(actor_id) = filter.actor_id {
        query.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(action) = filter.action.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND action = ").push_bind(action.to_string());
    }
    if let Some(entity_type) = filter.entity_type.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND entity_type = ").push_bind(entity_type.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_create_and_filter_audit_logs() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxAuditRepository::new(pool);

        for (actor, action) in [(Some(1), "comment.delete"), (Some(2), "post.delete"), (None, "auth.login_failed")] {
            repo.create(&NewAuditLog {
                actor_id: actor,
                action: action.to_string(),
                entity_type: "test".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let (all, total) = repo.list(&AuditFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].action, "auth.login_failed");

        let filter = AuditFilter {
            actor_id: Some(2),
            ..Default::default()
        };
        let (by_actor, _) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(by_actor.len(), 1);
        assert_eq!(by_actor[0].action, "post.delete");
    }
}
