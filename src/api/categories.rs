//! Category API endpoints
//!
//! - GET /discussBoard/categories - All categories
//! - GET /discussBoard/categories/{id} - One category
//! - POST /discussBoard/admin/categories - Create
//! - PUT|DELETE /discussBoard/admin/categories/{id} - Update or delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

/// Build the public categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
}

/// Build the admin categories router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
}

/// GET /discussBoard/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list().await?))
}

/// GET /discussBoard/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(id).await?))
}

/// POST /discussBoard/admin/categories
async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .category_service
        .create(user.user().id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /discussBoard/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(
        state
            .category_service
            .update(user.user().id, id, body)
            .await?,
    ))
}

/// DELETE /discussBoard/admin/categories/{id}
///
/// Refused while the category still holds visible posts.
async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(user.user().id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
