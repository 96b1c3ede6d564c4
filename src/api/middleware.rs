//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope returned by every endpoint
//! - Authentication (bearer access token validation)
//! - Authorization gates for moderator and administrator routes

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAuditRepository, SqlxCategoryRepository, SqlxCommentRepository, SqlxExportLogRepository,
    SqlxForbiddenWordRepository, SqlxModerationRepository, SqlxNotificationRepository,
    SqlxPostRepository, SqlxReactionRepository, SqlxReportRepository, SqlxSessionRepository,
    SqlxSettingsRepository, SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    SqlxVerificationRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use crate::services::{
    AdminService, AuditService, AuthContext, CategoryService, CommentService,
    ContentFilterService, EmailService, ExportService, LoginRateLimiter, ModerationService,
    NotificationService, PostService, ReactionService, ReportService, ServiceError,
    SettingsService, SubscriptionService, TagService, TokenService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub admin_service: Arc<AdminService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub reaction_service: Arc<ReactionService>,
    pub report_service: Arc<ReportService>,
    pub moderation_service: Arc<ModerationService>,
    pub notification_service: Arc<NotificationService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub audit_service: Arc<AuditService>,
    pub export_service: Arc<ExportService>,
    pub content_filter: Arc<ContentFilterService>,
    pub settings_service: Arc<SettingsService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    /// Whether `X-Forwarded-For` / `X-Real-IP` name the client
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// Wire every repository and service onto one pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let reaction_repo = SqlxReactionRepository::boxed(pool.clone());
        let report_repo = SqlxReportRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());

        let audit_service = Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone())));
        let settings_service = Arc::new(SettingsService::new(SqlxSettingsRepository::boxed(
            pool.clone(),
        )));
        let notification_service = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
        ));
        let content_filter = Arc::new(ContentFilterService::new(
            SqlxForbiddenWordRepository::boxed(pool.clone()),
        ));
        let rate_limiter = Arc::new(LoginRateLimiter::new());

        let user_service = Arc::new(
            UserService::new(
                user_repo.clone(),
                session_repo.clone(),
                SqlxVerificationRepository::boxed(pool.clone()),
                settings_service.clone(),
                audit_service.clone(),
                TokenService::new(&config.auth),
            )
            .with_email(Arc::new(EmailService::new(config.email.clone())))
            .with_rate_limiter(rate_limiter.clone())
            .with_password_min_length(config.board.password_min_length),
        );
        let admin_service = Arc::new(AdminService::new(
            user_repo.clone(),
            session_repo.clone(),
            audit_service.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(
            category_repo.clone(),
            audit_service.clone(),
        ));
        let tag_service = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            audit_service.clone(),
        ));
        let post_service = Arc::new(
            PostService::new(
                post_repo.clone(),
                user_repo.clone(),
                category_repo,
                comment_repo.clone(),
                reaction_repo.clone(),
                subscription_repo.clone(),
                tag_service.clone(),
                content_filter.clone(),
                audit_service.clone(),
            )
            .with_limits(&config.board),
        );
        let comment_service = Arc::new(
            CommentService::new(
                comment_repo.clone(),
                post_repo.clone(),
                user_repo.clone(),
                reaction_repo.clone(),
                subscription_repo.clone(),
                content_filter.clone(),
                notification_service.clone(),
                audit_service.clone(),
            )
            .with_rules(config.board.clone()),
        );
        let reaction_service = Arc::new(ReactionService::new(
            reaction_repo.clone(),
            post_repo.clone(),
            comment_repo.clone(),
        ));
        let report_service = Arc::new(ReportService::new(
            report_repo.clone(),
            post_repo.clone(),
            comment_repo.clone(),
            user_repo.clone(),
            notification_service.clone(),
            audit_service.clone(),
        ));
        let moderation_service = Arc::new(ModerationService::new(
            SqlxModerationRepository::boxed(pool.clone()),
            post_repo.clone(),
            comment_repo.clone(),
            user_repo.clone(),
            session_repo,
            report_service.clone(),
            notification_service.clone(),
            audit_service.clone(),
        ));
        let subscription_service = Arc::new(SubscriptionService::new(
            subscription_repo.clone(),
            post_repo.clone(),
        ));
        let export_service = Arc::new(ExportService::new(
            SqlxExportLogRepository::boxed(pool.clone()),
            user_repo,
            post_repo,
            comment_repo,
            report_repo,
            reaction_repo,
            subscription_repo,
            audit_service.clone(),
        ));

        Self {
            pool,
            user_service,
            admin_service,
            category_service,
            tag_service,
            post_service,
            comment_service,
            reaction_service,
            report_service,
            moderation_service,
            notification_service,
            subscription_service,
            audit_service,
            export_service,
            content_filter,
            settings_service,
            rate_limiter,
            trust_proxy_headers: config.server.trusted_proxy,
        }
    }
}

/// Authenticated caller extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthContext);

impl AuthenticatedUser {
    pub fn user(&self) -> &User {
        &self.0.user
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Caller on a public route, when they sent a valid token
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthContext>);

impl MaybeUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|ctx| ctx.user.id)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

/// Client address: the socket peer, or the proxy headers when the
/// deployment sits behind a trusted reverse proxy
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    pub fn as_string(&self) -> Option<String> {
        self.0.map(|ip| ip.to_string())
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(resolve_client_ip(
            &parts.headers,
            peer,
            state.trust_proxy_headers,
        )))
    }
}

/// Pick the client address for a request. Proxy headers are client
/// controlled, so they only count when `trust_proxy` is set.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        extract_ip_address(headers).or(peer)
    } else {
        peer
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Validation(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::RateLimited(msg) => ApiError::with_details(
                "RATE_LIMIT",
                msg,
                serde_json::json!({ "retry_after": 60 }),
            ),
            ServiceError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Extract the bearer access token from request headers
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Client address reported by a reverse proxy
pub fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = ip.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let ctx = state.user_service.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(ctx));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// A missing or bad token leaves the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer_token(request.headers()) {
        if let Ok(ctx) = state.user_service.authenticate(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(ctx));
        }
    }
    next.run(request).await
}

fn require_role(request: &Request, role: UserRole) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.user().role < role {
        return Err(ApiError::forbidden(match role {
            UserRole::Administrator => "Administrator privileges required",
            _ => "Moderator privileges required",
        }));
    }
    Ok(())
}

/// Moderator authorization middleware (administrators pass too)
pub async fn require_moderator(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, UserRole::Moderator)?;
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, UserRole::Administrator)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_extract_bearer_token() {
        let map = headers(&[("authorization", "Bearer test-token-123")]);
        assert_eq!(extract_bearer_token(&map), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_schemes() {
        assert!(extract_bearer_token(&headers(&[("authorization", "Basic abc")])).is_none());
        assert!(extract_bearer_token(&headers(&[("authorization", "Bearer ")])).is_none());
        assert!(extract_bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(extract_ip_address(&map), "203.0.113.7".parse().ok());

        let map = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(extract_ip_address(&map), "198.51.100.2".parse().ok());

        let map = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert!(extract_ip_address(&map).is_none());
    }

    #[test]
    fn test_proxy_headers_need_trust() {
        let peer: Option<IpAddr> = "192.0.2.10".parse().ok();
        let spoofed = headers(&[("x-forwarded-for", "203.0.113.7")]);

        assert_eq!(resolve_client_ip(&spoofed, peer, false), peer);
        assert_eq!(resolve_client_ip(&spoofed, None, false), None);
        assert_eq!(
            resolve_client_ip(&spoofed, peer, true),
            "203.0.113.7".parse().ok()
        );
        assert_eq!(resolve_client_ip(&HeaderMap::new(), peer, true), peer);
    }

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::not_found("Post"), StatusCode::NOT_FOUND),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden("x"), StatusCode::FORBIDDEN),
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (ServiceError::conflict("x"), StatusCode::CONFLICT),
            (ServiceError::RateLimited("x".into()), StatusCode::TOO_MANY_REQUESTS),
            (
                ServiceError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(ServiceError::Internal(anyhow::anyhow!("secret table missing")));
        assert_eq!(err.error.message, "Internal server error");
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({"field": "username"});
        let error = ApiError::with_details("VALIDATION_ERROR", "Invalid", details.clone());
        assert_eq!(error.error.details, Some(details));
    }
}
