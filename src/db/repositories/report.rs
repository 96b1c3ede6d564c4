//! Report repository

use crate::db::DynDatabasePool;
use crate::models::{CreateReportInput, ListParams, Report, ReportFilter, ReportStatus, TargetType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::sync::Arc;

const REPORT_COLUMNS: &str = "id, reporter_id, target_type, target_id, reason, details, status, \
     resolution_note, resolved_by, resolved_at, created_at, updated_at";

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, reporter_id: i64, input: &CreateReportInput) -> Result<Report>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Report>>;

    /// Pending or reviewing report by this reporter against the target
    async fn find_open(
        &self,
        reporter_id: i64,
        target_type: TargetType,
        target_id: i64,
    ) -> Result<Option<Report>>;

    async fn list(&self, filter: &ReportFilter, params: &ListParams) -> Result<(Vec<Report>, i64)>;

    async fn list_by_reporter(&self, reporter_id: i64) -> Result<Vec<Report>>;

    async fn update_status(
        &self,
        id: i64,
        status: ReportStatus,
        resolution_note: Option<&str>,
        resolved_by: Option<i64>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;
}

pub struct SqlxReportRepository {
    pool: DynDatabasePool,
}

impl SqlxReportRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReportRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReportRepository for SqlxReportRepository {
    async fn create(&self, reporter_id: i64, input: &CreateReportInput) -> Result<Report> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO reports (reporter_id, target_type, target_id, reason, details, status,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reporter_id)
        .bind(input.target_type.as_str())
        .bind(input.target_id)
        .bind(&input.reason)
        .bind(&input.details)
        .bind(ReportStatus::Pending.to_string())
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create report")?;

        Ok(Report {
            id: result.last_insert_rowid(),
            reporter_id,
            target_type: input.target_type,
            target_id: input.target_id,
            reason: input.reason.clone(),
            details: input.details.clone(),
            status: ReportStatus::Pending,
            resolution_note: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Report>> {
        let sql = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get report by ID")?;
        row.as_ref().map(row_to_report).transpose()
    }

    async fn find_open(
        &self,
        reporter_id: i64,
        target_type: TargetType,
        target_id: i64,
    ) -> Result<Option<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE reporter_id = ? AND target_type = ? AND target_id = ? \
             AND status IN ('pending', 'reviewing') LIMIT 1",
            REPORT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(reporter_id)
            .bind(target_type.as_str())
            .bind(target_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to look up open report")?;
        row.as_ref().map(row_to_report).transpose()
    }

    async fn list(&self, filter: &ReportFilter, params: &ListParams) -> Result<(Vec<Report>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM reports WHERE 1 = 1");
        push_report_filter(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count reports")?;

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM reports WHERE 1 = 1", REPORT_COLUMNS));
        push_report_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list reports")?;

        let reports = rows.iter().map(row_to_report).collect::<Result<Vec<_>>>()?;
        Ok((reports, total))
    }

    async fn list_by_reporter(&self, reporter_id: i64) -> Result<Vec<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE reporter_id = ? ORDER BY created_at DESC, id DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(reporter_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list reports by reporter")?;
        rows.iter().map(row_to_report).collect()
    }

    async fn update_status(
        &self,
        id: i64,
        status: ReportStatus,
        resolution_note: Option<&str>,
        resolved_by: Option<i64>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?, resolution_note = COALESCE(?, resolution_note),
                resolved_by = ?, resolved_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(resolution_note)
        .bind(resolved_by)
        .bind(resolved_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update report status")?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_report_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &ReportFilter) {
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(reporter_id) = filter.reporter_id {
        query.push(" AND reporter_id = ").push_bind(reporter_id);
    }
    if let Some(target_type) = filter.target_type {
        query.push(" AND target_type = ").push_bind(target_type.as_str());
    }
}

fn row_to_report(row: &sqlx::sqlite::SqliteRow) -> Result<Report> {
    let target_type: String = row.get("target_type");
    let status: String = row.get("status");
    Ok(Report {
        id: row.get("id"),
        reporter_id: row.get("reporter_id"),
        target_type: TargetType::from_str(&target_type)?,
        target_id: row.get("target_id"),
        reason: row.get("reason"),
        details: row.get("details"),
        status: ReportStatus::from_str(&status)?,
        resolution_note: row.get("resolution_note"),
        resolved_by: row.get("resolved_by"),
        resolved_at: row.get("resolved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
