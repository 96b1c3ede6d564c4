//! Reaction API endpoints
//!
//! - GET /discussBoard/posts/{post_id}/reactions - Like/dislike counts
//! - PUT /discussBoard/member/reactions - React to a post or comment
//! - DELETE /discussBoard/member/reactions?target_type=&target_id= - Remove it

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{ReactInput, ReactionSummary, ReactionTarget};

/// Build the public reactions router
pub fn router() -> Router<AppState> {
    Router::new().route("/posts/{post_id}/reactions", get(post_reactions))
}

/// Build the member reactions router
pub fn member_router() -> Router<AppState> {
    Router::new().route("/reactions", put(react).delete(unreact))
}

/// GET /discussBoard/posts/{post_id}/reactions
///
/// Signed-in callers also see their own reaction.
async fn post_reactions(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ReactionSummary>, ApiError> {
    Ok(Json(
        state
            .reaction_service
            .post_summary(post_id, viewer.user_id())
            .await?,
    ))
}

/// PUT /discussBoard/member/reactions
async fn react(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ReactInput>,
) -> Result<Json<ReactionSummary>, ApiError> {
    Ok(Json(state.reaction_service.react(user.user().id, body).await?))
}

/// DELETE /discussBoard/member/reactions
async fn unreact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(target): Query<ReactionTarget>,
) -> Result<Json<ReactionSummary>, ApiError> {
    Ok(Json(
        state
            .reaction_service
            .unreact(user.user().id, target)
            .await?,
    ))
}
