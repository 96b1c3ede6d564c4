//! Comment API endpoints
//!
//! - GET /discussBoard/posts/{post_id}/comments - Threaded comments
//! - POST /discussBoard/member/posts/{post_id}/comments - Comment or reply
//! - PUT /discussBoard/member/posts/{post_id}/comments/{comment_id} - Edit
//! - DELETE /discussBoard/member/posts/{post_id}/comments/{comment_id} - Delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{CommentNode, CreateCommentInput, UpdateCommentInput};

/// Build the public comments router
pub fn router() -> Router<AppState> {
    Router::new().route("/posts/{post_id}/comments", get(list_comments))
}

/// Build the member comments router
pub fn member_router() -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/comments", post(create_comment))
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
}

/// GET /discussBoard/posts/{post_id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentNode>>, ApiError> {
    Ok(Json(state.comment_service.list_for_post(post_id).await?))
}

/// POST /discussBoard/member/posts/{post_id}/comments
async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(user.user(), post_id, body, ip.as_string().as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /discussBoard/member/posts/{post_id}/comments/{comment_id}
async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateCommentInput>,
) -> Result<Json<CommentNode>, ApiError> {
    Ok(Json(
        state
            .comment_service
            .update(user.user(), post_id, comment_id, body)
            .await?,
    ))
}

/// DELETE /discussBoard/member/posts/{post_id}/comments/{comment_id}
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .comment_service
        .delete(user.user(), post_id, comment_id, ip.as_string().as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
