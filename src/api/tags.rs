//! Tag API endpoints
//!
//! - GET /discussBoard/tags - Tags with post counts
//! - DELETE /discussBoard/admin/tags/{id} - Remove a tag from every post

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::TagWithCount;

/// Build the public tags router
pub fn router() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}

/// Build the admin tags router
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/tags/{id}", delete(delete_tag))
}

/// GET /discussBoard/tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

/// DELETE /discussBoard/admin/tags/{id}
async fn delete_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(user.user().id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
