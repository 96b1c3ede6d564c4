//! Moderation API endpoints
//!
//! - POST /discussBoard/moderator/actions - Apply an action
//! - GET /discussBoard/moderator/actions - Action history

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::PageResponse;
use crate::models::{
    ApplyModerationInput, ListParams, ModerationAction, ModerationActionKind, ModerationFilter,
    TargetType,
};

/// Query parameters for the action history
#[derive(Debug, Deserialize)]
pub struct ListActionsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub moderator_id: Option<i64>,
    pub action: Option<ModerationActionKind>,
    pub target_type: Option<TargetType>,
    pub target_user_id: Option<i64>,
}

/// Build the moderator actions router
pub fn moderator_router() -> Router<AppState> {
    Router::new().route("/actions", post(apply_action).get(list_actions))
}

/// POST /discussBoard/moderator/actions
async fn apply_action(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<ApplyModerationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let action = state
        .moderation_service
        .apply(user.user(), body, ip.as_string().as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(action)))
}

/// GET /discussBoard/moderator/actions
async fn list_actions(
    State(state): State<AppState>,
    Query(query): Query<ListActionsQuery>,
) -> Result<Json<PageResponse<ModerationAction>>, ApiError> {
    let filter = ModerationFilter {
        moderator_id: query.moderator_id,
        action: query.action,
        target_type: query.target_type,
        target_user_id: query.target_user_id,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .moderation_service
            .list(&filter, &params)
            .await?
            .into(),
    ))
}
