//! Post API endpoints
//!
//! - GET /discussBoard/posts - List visible posts (filters, sort, paging)
//! - GET /discussBoard/posts/{post_id} - Post detail (counts a view)
//! - POST /discussBoard/member/posts - Create
//! - PUT /discussBoard/member/posts/{post_id} - Edit (author)
//! - DELETE /discussBoard/member/posts/{post_id} - Delete (author or staff)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, non_empty};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::PageResponse;
use crate::models::{
    normalize_tag_name, CreatePostInput, ListParams, PostDetail, PostFilter, PostSort,
    UpdatePostInput,
};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub tag: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: PostSort,
}

impl ListPostsQuery {
    fn filter(&self) -> PostFilter {
        PostFilter {
            category_id: self.category_id,
            author_id: self.author_id,
            tag: self.tag.as_deref().and_then(normalize_tag_name),
            search: non_empty(self.search.clone()),
            sort: self.sort,
        }
    }
}

/// Build the public posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{post_id}", get(get_post))
}

/// Build the member posts router
pub fn member_router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{post_id}", put(update_post).delete(delete_post))
}

/// GET /discussBoard/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PageResponse<PostDetail>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let result = state.post_service.list(&query.filter(), &params).await?;
    Ok(Json(result.into()))
}

/// GET /discussBoard/posts/{post_id}
async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(state.post_service.view(post_id).await?))
}

/// POST /discussBoard/member/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .create(user.user(), body, ip.as_string().as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /discussBoard/member/posts/{post_id}
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(post_id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(
        state
            .post_service
            .update(user.user(), post_id, body, ip.as_string().as_deref())
            .await?,
    ))
}

/// DELETE /discussBoard/member/posts/{post_id}
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .post_service
        .delete(user.user(), post_id, ip.as_string().as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
