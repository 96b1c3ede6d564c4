//! Data export API endpoints
//!
//! - GET /discussBoard/member/export - Caller's own data
//! - GET /discussBoard/admin/users/{id}/export - Any member's data
//! - GET /discussBoard/admin/export-logs - Who exported what

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::PageResponse;
use crate::models::{ExportLog, ListParams, UserDataExport};

/// Query parameters for the export log
#[derive(Debug, Deserialize)]
pub struct ListExportLogsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub user_id: Option<i64>,
}

/// Build the member export router
pub fn member_router() -> Router<AppState> {
    Router::new().route("/export", get(export_me))
}

/// Build the admin export router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/export", get(export_user))
        .route("/export-logs", get(list_export_logs))
}

/// GET /discussBoard/member/export
async fn export_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
) -> Result<Json<UserDataExport>, ApiError> {
    let me = user.user();
    Ok(Json(
        state
            .export_service
            .export_user(me, me.id, ip.as_string().as_deref())
            .await?,
    ))
}

/// GET /discussBoard/admin/users/{id}/export
async fn export_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<UserDataExport>, ApiError> {
    Ok(Json(
        state
            .export_service
            .export_user(user.user(), id, ip.as_string().as_deref())
            .await?,
    ))
}

/// GET /discussBoard/admin/export-logs
async fn list_export_logs(
    State(state): State<AppState>,
    Query(query): Query<ListExportLogsQuery>,
) -> Result<Json<PageResponse<ExportLog>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .export_service
            .list_logs(query.user_id, &params)
            .await?
            .into(),
    ))
}
