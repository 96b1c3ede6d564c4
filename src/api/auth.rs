//! Authentication API endpoints
//!
//! Handles HTTP requests for accounts and sessions:
//! - POST /auth/member/join - Registration
//! - POST /auth/member/verify-email - Confirm the emailed code
//! - POST /auth/member/resend-verification - Send a new code
//! - POST /auth/{member,moderator,admin}/login - Role-gated login
//! - POST /auth/refresh - Rotate the refresh token
//! - POST /auth/logout - End the current session
//! - GET|PUT /auth/me - Current profile
//! - PUT /auth/password - Change password

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::responses::MessageResponse;
use crate::models::{User, UserRole};
use crate::services::{
    AuthTokens, ChangePasswordInput, JoinInput, LoginInput, RefreshInput,
    ResendVerificationInput, UpdateProfileInput, VerifyEmailInput,
};

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/member/join", post(join))
        .route("/member/verify-email", post(verify_email))
        .route("/member/resend-verification", post(resend_verification))
        .route("/member/login", post(member_login))
        .route("/moderator/login", post(moderator_login))
        .route("/admin/login", post(admin_login))
        .route("/refresh", post(refresh))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user).put(update_profile))
        .route("/password", put(change_password))
}

/// POST /auth/member/join - Register a new member
async fn join(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<JoinInput>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .user_service
        .join(body, ip.as_string().as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /auth/member/verify-email
async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.verify_email(body).await?))
}

/// POST /auth/member/resend-verification
async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.resend_verification(body).await?;
    Ok(Json(MessageResponse::new("Verification code sent")))
}

async fn login_as(
    state: &AppState,
    body: LoginInput,
    role: UserRole,
    ip: ClientIp,
) -> Result<Json<AuthTokens>, ApiError> {
    Ok(Json(state.user_service.login(body, role, ip.0).await?))
}

/// POST /auth/member/login
async fn member_login(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthTokens>, ApiError> {
    login_as(&state, body, UserRole::Member, ip).await
}

/// POST /auth/moderator/login - Moderators and administrators only
async fn moderator_login(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthTokens>, ApiError> {
    login_as(&state, body, UserRole::Moderator, ip).await
}

/// POST /auth/admin/login - Administrators only
async fn admin_login(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthTokens>, ApiError> {
    login_as(&state, body, UserRole::Administrator, ip).await
}

/// POST /auth/refresh - Trade a refresh token for a new pair
async fn refresh(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(body): Json<RefreshInput>,
) -> Result<Json<AuthTokens>, ApiError> {
    Ok(Json(
        state
            .user_service
            .refresh(body, ip.as_string().as_deref())
            .await?,
    ))
}

/// POST /auth/logout - End the session behind the access token
async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_service.logout(user.0.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Get current user
async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.me(user.user().id).await?))
}

/// PUT /auth/me - Change nickname
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state
            .user_service
            .update_profile(user.user().id, body)
            .await?,
    ))
}

/// PUT /auth/password - Change password; other sessions are signed out
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<ChangePasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .user_service
        .change_password(&user.0, body, ip.as_string().as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}
