//! Subscription API endpoints
//!
//! - GET /discussBoard/member/subscriptions - Posts the caller follows
//! - PUT|DELETE /discussBoard/member/posts/{post_id}/subscription

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Subscription;

/// Build the member subscriptions router
pub fn member_router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(list_subscriptions))
        .route("/posts/{post_id}/subscription", put(subscribe).delete(unsubscribe))
}

/// GET /discussBoard/member/subscriptions
async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    Ok(Json(state.subscription_service.list(user.user().id).await?))
}

/// PUT /discussBoard/member/posts/{post_id}/subscription
async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Subscription>, ApiError> {
    Ok(Json(
        state
            .subscription_service
            .subscribe(user.user().id, post_id)
            .await?,
    ))
}

/// DELETE /discussBoard/member/posts/{post_id}/subscription
async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .subscription_service
        .unsubscribe(user.user().id, post_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
