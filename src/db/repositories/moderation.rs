//! Moderation action repository

use crate::db::DynDatabasePool;
use crate::models::{ListParams, ModerationAction, ModerationActionKind, ModerationFilter, TargetType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::sync::Arc;

const ACTION_COLUMNS: &str = "id, moderator_id, action, target_type, target_id, target_user_id, \
     reason, report_id, created_at";

/// Row data for a moderation action
#[derive(Debug, Clone)]
pub struct NewModerationAction {
    pub moderator_id: i64,
    pub action: ModerationActionKind,
    pub target_id: i64,
    pub target_user_id: Option<i64>,
    pub reason: String,
    pub report_id: Option<i64>,
}

#[async_trait]
pub trait ModerationRepository: Send + Sync {
    async fn create(&self, action: &NewModerationAction) -> Result<ModerationAction>;

    async fn list(
        &self,
        filter: &ModerationFilter,
        params: &ListParams,
    ) -> Result<(Vec<ModerationAction>, i64)>;
}

pub struct SqlxModerationRepository {
    pool: DynDatabasePool,
}

impl SqlxModerationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModerationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModerationRepository for SqlxModerationRepository {
    async fn create(&self, action: &NewModerationAction) -> Result<ModerationAction> {
        let now = Utc::now();
        let target_type = action.action.target_type();
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_actions (moderator_id, action, target_type, target_id,
                                            target_user_id, reason, report_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.moderator_id)
        .bind(action.action.as_str())
        .bind(target_type.as_str())
        .bind(action.target_id)
        .bind(action.target_user_id)
        .bind(&action.reason)
        .bind(action.report_id)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to record moderation action")?;

        Ok(ModerationAction {
            id: result.last_insert_rowid(),
            moderator_id: action.moderator_id,
            action: action.action,
            target_type,
            target_id: action.target_id,
            target_user_id: action.target_user_id,
            reason: action.reason.clone(),
            report_id: action.report_id,
            created_at: now,
        })
    }

    async fn list(
        &self,
        filter: &ModerationFilter,
        params: &ListParams,
    ) -> Result<(Vec<ModerationAction>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM moderation_actions WHERE 1 = 1");
        push_moderation_filter(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count moderation actions")?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM moderation_actions WHERE 1 = 1",
            ACTION_COLUMNS
        ));
        push_moderation_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list moderation actions")?;

        let actions = rows.iter().map(row_to_action).collect::<Result<Vec<_>>>()?;
        Ok((actions, total))
    }
}

fn push_moderation_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &ModerationFilter) {
    if let Some(moderator_id) = filter.moderator_id {
        query.push(" AND moderator_id = ").push_bind(moderator_id);
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(target_type) = filter.target_type {
        query.push(" AND target_type = ").push_bind(target_type.as_str());
    }
    if let Some(target_user_id) = filter.target_user_id {
        query.push(" AND target_user_id = ").push_bind(target_user_id);
    }
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<ModerationAction> {
    let action: String = row.get("action");
    let target_type: String = row.get("target_type");
    Ok(ModerationAction {
        id: row.get("id"),
        moderator_id: row.get("moderator_id"),
        action: ModerationActionKind::from_str(&action)?,
        target_type: TargetType::from_str(&target_type)?,
        target_id: row.get("target_id"),
        target_user_id: row.get("target_user_id"),
        reason: row.get("reason"),
        report_id: row.get("report_id"),
        created_at: row.get("created_at"),
    })
}
