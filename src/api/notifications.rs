//! Notification API endpoints
//!
//! All routes act on the caller's own inbox under /discussBoard/member.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{CountResponse, PageResponse};
use crate::models::{ListParams, Notification};

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub unread_only: bool,
}

/// Build the member notifications router
pub fn member_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/{id}/read", put(mark_read))
        .route("/notifications/{id}", delete(delete_notification))
}

/// GET /discussBoard/member/notifications
async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<PageResponse<Notification>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .notification_service
            .list(user.user().id, query.unread_only, &params)
            .await?
            .into(),
    ))
}

/// GET /discussBoard/member/notifications/unread-count
async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .notification_service
        .unread_count(user.user().id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /discussBoard/member/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(
        state
            .notification_service
            .mark_read(user.user().id, id)
            .await?,
    ))
}

/// PUT /discussBoard/member/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let updated = state
        .notification_service
        .mark_all_read(user.user().id)
        .await?;
    Ok(Json(CountResponse {
        count: updated as i64,
    }))
}

/// DELETE /discussBoard/member/notifications/{id}
async fn delete_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .notification_service
        .delete(user.user().id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
