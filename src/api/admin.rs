//! Admin API endpoints
//!
//! Handles HTTP requests for board administration:
//! - Member management (role, status, verification, removal)
//! - Forbidden word list
//! - Audit log browsing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, non_empty};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::PageResponse;
use crate::models::{
    AuditFilter, AuditLog, ForbiddenWord, ListParams, User, UserFilter, UserRole, UserStatus,
};

/// Query parameters for the member list
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

/// Query parameters for the audit log
#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub actor_id: Option<i64>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct ForbiddenWordRequest {
    pub word: String,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/role", put(change_role))
        .route("/users/{id}/status", put(change_status))
        .route("/users/{id}/verify", put(verify_user))
        .route(
            "/forbidden-words",
            get(list_forbidden_words).post(add_forbidden_word),
        )
        .route("/forbidden-words/{id}", delete(delete_forbidden_word))
        .route("/audit-logs", get(list_audit_logs))
}

// ============================================================================
// Members
// ============================================================================

/// GET /discussBoard/admin/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PageResponse<User>>, ApiError> {
    let filter = UserFilter {
        role: query.role,
        status: query.status,
        search: non_empty(query.search),
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .admin_service
            .list_users(&filter, &params)
            .await?
            .into(),
    ))
}

/// GET /discussBoard/admin/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.admin_service.get_user(id).await?))
}

/// PUT /discussBoard/admin/users/{id}/role
async fn change_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state
            .admin_service
            .change_role(user.user(), id, body.role, ip.as_string().as_deref())
            .await?,
    ))
}

/// PUT /discussBoard/admin/users/{id}/status
///
/// Suspending a member also ends all of their sessions.
async fn change_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    Json(body): Json<ChangeStatusRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state
            .admin_service
            .change_status(user.user(), id, body.status, ip.as_string().as_deref())
            .await?,
    ))
}

/// PUT /discussBoard/admin/users/{id}/verify
async fn verify_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state
            .admin_service
            .verify_email(user.user(), id, ip.as_string().as_deref())
            .await?,
    ))
}

/// DELETE /discussBoard/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .admin_service
        .delete_user(user.user(), id, ip.as_string().as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Forbidden words
// ============================================================================

/// GET /discussBoard/admin/forbidden-words
async fn list_forbidden_words(
    State(state): State<AppState>,
) -> Result<Json<Vec<ForbiddenWord>>, ApiError> {
    Ok(Json(state.content_filter.list().await?))
}

/// POST /discussBoard/admin/forbidden-words
async fn add_forbidden_word(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<ForbiddenWordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admin_id = user.user().id;
    let word = state.content_filter.add(&body.word, Some(admin_id)).await?;
    state
        .audit_service
        .record(
            Some(admin_id),
            "forbidden_word_add",
            "forbidden_word",
            Some(word.id),
            Some(word.word.clone()),
            ip.as_string().as_deref(),
        )
        .await;
    Ok((StatusCode::CREATED, Json(word)))
}

/// DELETE /discussBoard/admin/forbidden-words/{id}
async fn delete_forbidden_word(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.content_filter.delete(id).await?;
    state
        .audit_service
        .record(
            Some(user.user().id),
            "forbidden_word_delete",
            "forbidden_word",
            Some(id),
            None,
            ip.as_string().as_deref(),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Audit log
// ============================================================================

/// GET /discussBoard/admin/audit-logs
async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<ListAuditQuery>,
) -> Result<Json<PageResponse<AuditLog>>, ApiError> {
    let filter = AuditFilter {
        actor_id: query.actor_id,
        action: non_empty(query.action),
        entity_type: non_empty(query.entity_type),
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.audit_service.list(&filter, &params).await?.into()))
}
