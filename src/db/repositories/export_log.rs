//! Export log repository

use crate::db::DynDatabasePool;
use crate::models::{ExportLog, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ExportLogRepository: Send + Sync {
    async fn create(
        &self,
        requested_by: i64,
        subject_user_id: i64,
        format: &str,
        ip_address: Option<&str>,
    ) -> Result<ExportLog>;

    /// Export logs, optionally for one subject
    async fn list(
        &self,
        subject_user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<(Vec<ExportLog>, i64)>;
}

pub struct SqlxExportLogRepository {
    pool: DynDatabasePool,
}

impl SqlxExportLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ExportLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ExportLogRepository for SqlxExportLogRepository {
    async fn create(
        &self,
        requested_by: i64,
        subject_user_id: i64,
        format: &str,
        ip_address: Option<&str>,
    ) -> Result<ExportLog> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO export_logs (requested_by, subject_user_id, format, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(requested_by)
        .bind(subject_user_id)
        .bind(format)
        .bind(ip_address)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to write export log")?;

        Ok(ExportLog {
            id: result.last_insert_rowid(),
            requested_by,
            subject_user_id,
            format: format.to_string(),
            ip_address: ip_address.map(str::to_string),
            created_at: now,
        })
    }

    async fn list(
        &self,
        subject_user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<(Vec<ExportLog>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM export_logs WHERE (? IS NULL OR subject_user_id = ?)",
        )
        .bind(subject_user_id)
        .bind(subject_user_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count export logs")?;

        let rows = sqlx::query(
            r#"
            SELECT id, requested_by, subject_user_id, format, ip_address, created_at
            FROM export_logs
            WHERE (? IS NULL OR subject_user_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(subject_user_id)
        .bind(subject_user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list export logs")?;

        let logs = rows
            .iter()
            .map(|row| ExportLog {
                id: row.get("id"),
                requested_by: row.get("requested_by"),
                subject_user_id: row.get("subject_user_id"),
                format: row.get("format"),
                ip_address: row.get("ip_address"),
                created_at: row.get("created_at"),
            })
            .collect();
        Ok((logs, total))
    }
}
