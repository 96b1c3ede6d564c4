//! Report API endpoints
//!
//! Members:
//! - POST /discussBoard/member/reports - File a report
//! - GET /discussBoard/member/reports - Own reports
//!
//! Moderators:
//! - GET /discussBoard/moderator/reports - Queue, filterable by status
//! - GET|PUT /discussBoard/moderator/reports/{id} - Inspect or change status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::PageResponse;
use crate::models::{
    CreateReportInput, ListParams, Report, ReportFilter, ReportStatus, TargetType,
    UpdateReportStatusInput,
};

/// Query parameters for the moderator report queue
#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<ReportStatus>,
    pub reporter_id: Option<i64>,
    pub target_type: Option<TargetType>,
}

/// Build the member reports router
pub fn member_router() -> Router<AppState> {
    Router::new().route("/reports", post(create_report).get(list_my_reports))
}

/// Build the moderator reports router
pub fn moderator_router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/{id}", get(get_report).put(update_report_status))
}

/// POST /discussBoard/member/reports
async fn create_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<CreateReportInput>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .report_service
        .create(user.user(), body, ip.as_string().as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /discussBoard/member/reports
async fn list_my_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(state.report_service.list_mine(user.user().id).await?))
}

/// GET /discussBoard/moderator/reports
async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<PageResponse<Report>>, ApiError> {
    let filter = ReportFilter {
        status: query.status,
        reporter_id: query.reporter_id,
        target_type: query.target_type,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.report_service.list(&filter, &params).await?.into()))
}

/// GET /discussBoard/moderator/reports/{id}
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(state.report_service.get(id).await?))
}

/// PUT /discussBoard/moderator/reports/{id}
async fn update_report_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    Json(body): Json<UpdateReportStatusInput>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(
        state
            .report_service
            .update_status(user.user(), id, body, ip.as_string().as_deref())
            .await?,
    ))
}
