//! Account service
//!
//! Registration, email verification, login, token refresh and the signed-in
//! member's own profile. Administrator operations on other accounts live in
//! `services::admin`.

use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::db::repositories::{SessionRepository, UserRepository, VerificationRepository};
use crate::models::{NewUser, User, UserRole};

use super::audit::AuditService;
use super::email::{generate_verification_code, EmailService};
use super::error::{ServiceError, ServiceResult};
use super::password::{hash_password, validate_password, verify_password};
use super::rate_limiter::LoginRateLimiter;
use super::settings::SettingsService;
use super::token::{generate_refresh_token, hash_refresh_token, TokenService};

/// Verification codes expire after this many minutes
pub const VERIFICATION_CODE_MINUTES: i64 = 10;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,32}$").expect("username pattern is valid"));

#[derive(Debug, Clone, Deserialize)]
pub struct JoinInput {
    pub email: String,
    pub username: String,
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Email or username
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendVerificationInput {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileInput {
    pub nickname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Token pair handed out by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub user: User,
    pub verification_required: bool,
}

/// The caller behind a verified access token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session_id: i64,
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    verification_repo: Arc<dyn VerificationRepository>,
    settings: Arc<SettingsService>,
    audit: Arc<AuditService>,
    tokens: TokenService,
    email: Option<Arc<EmailService>>,
    limiter: Arc<LoginRateLimiter>,
    password_min_length: usize,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        verification_repo: Arc<dyn VerificationRepository>,
        settings: Arc<SettingsService>,
        audit: Arc<AuditService>,
        tokens: TokenService,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            verification_repo,
            settings,
            audit,
            tokens,
            email: None,
            limiter: Arc::new(LoginRateLimiter::new()),
            password_min_length: 8,
        }
    }

    pub fn with_email(mut self, email: Arc<EmailService>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<LoginRateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_password_min_length(mut self, min_length: usize) -> Self {
        self.password_min_length = min_length;
        self
    }

    /// Register a new member.
    ///
    /// The very first account becomes a verified administrator and is
    /// accepted even when registration is closed.
    pub async fn join(&self, input: JoinInput, ip: Option<&str>) -> ServiceResult<JoinOutcome> {
        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();
        let nickname = input.nickname.trim().to_string();

        if email.is_empty() || username.is_empty() || nickname.is_empty() {
            return Err(ServiceError::validation(
                "Email, username and nickname are required",
            ));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(ServiceError::validation("Invalid email format"));
        }
        if !USERNAME_RE.is_match(&username) {
            return Err(ServiceError::validation(
                "Username must be 3-32 letters, digits or underscores",
            ));
        }
        validate_nickname(&nickname)?;
        validate_password(&input.password, self.password_min_length)
            .map_err(ServiceError::Validation)?;

        let is_first = self.user_repo.count().await? == 0;
        let settings = self.settings.get_board_settings().await?;
        if !is_first && !settings.allow_registration {
            return Err(ServiceError::forbidden("Registration is closed"));
        }

        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("Email is already registered"));
        }
        if self.user_repo.get_by_username(&username).await?.is_some() {
            return Err(ServiceError::conflict("Username is already taken"));
        }
        if self.user_repo.get_by_nickname(&nickname).await?.is_some() {
            return Err(ServiceError::conflict("Nickname is already taken"));
        }

        let verification_required = !is_first && settings.require_email_verification;
        let password_hash = hash_password(&input.password)?;
        let user = self
            .user_repo
            .create(&NewUser {
                email,
                username,
                nickname,
                password_hash,
                role: if is_first {
                    UserRole::Administrator
                } else {
                    UserRole::Member
                },
                email_verified: !verification_required,
            })
            .await
            .context("Failed to create user")?;

        if verification_required {
            self.issue_verification_code(&user, &settings.board_name)
                .await?;
        }

        self.audit
            .record(Some(user.id), "user_join", "user", Some(user.id), None, ip)
            .await;
        tracing::info!("New {} joined: {} (id {})", user.role, user.username, user.id);

        Ok(JoinOutcome {
            user,
            verification_required,
        })
    }

    async fn issue_verification_code(&self, user: &User, board_name: &str) -> ServiceResult<()> {
        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_MINUTES);
        self.verification_repo
            .replace(user.id, &code, expires_at)
            .await?;

        match &self.email {
            Some(email) => {
                if let Err(e) = email
                    .send_verification_code(&user.email, &code, board_name)
                    .await
                {
                    tracing::warn!("Failed to send verification code to {}: {:#}", user.email, e);
                }
            }
            None => tracing::warn!("No mailer configured; verification code for {} not sent", user.email),
        }
        Ok(())
    }

    pub async fn verify_email(&self, input: VerifyEmailInput) -> ServiceResult<User> {
        let email = input.email.trim().to_lowercase();
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::validation("Invalid verification code"))?;

        if user.email_verified {
            return Ok(user);
        }

        let pending = self
            .verification_repo
            .latest_for_user(user.id)
            .await?
            .ok_or_else(|| ServiceError::validation("Invalid verification code"))?;
        if pending.code != input.code.trim() {
            return Err(ServiceError::validation("Invalid verification code"));
        }
        if pending.is_expired() {
            return Err(ServiceError::validation("Verification code has expired"));
        }

        self.user_repo.set_email_verified(user.id, true).await?;
        self.verification_repo.delete_for_user(user.id).await?;
        self.audit
            .record(Some(user.id), "email_verified", "user", Some(user.id), None, None)
            .await;

        self.load_user(user.id).await
    }

    pub async fn resend_verification(&self, input: ResendVerificationInput) -> ServiceResult<()> {
        let email = input.email.trim().to_lowercase();
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Account"))?;
        if user.email_verified {
            return Err(ServiceError::conflict("Email is already verified"));
        }
        let settings = self.settings.get_board_settings().await?;
        self.issue_verification_code(&user, &settings.board_name)
            .await
    }

    /// Log in through one of the role-specific login routes.
    ///
    /// `required_role` is the least privileged role the route admits.
    pub async fn login(
        &self,
        input: LoginInput,
        required_role: UserRole,
        ip: Option<IpAddr>,
    ) -> ServiceResult<AuthTokens> {
        let identifier = input.identifier.trim();
        let ip_text = ip.map(|ip| ip.to_string());

        if let Some(ip) = ip {
            if self.limiter.is_ip_limited(ip).await {
                return Err(ServiceError::RateLimited(
                    "Too many login requests, try again later".to_string(),
                ));
            }
            self.limiter.record_ip_request(ip).await;
        }
        if self.limiter.is_identifier_limited(identifier).await {
            return Err(ServiceError::RateLimited(
                "Too many failed login attempts, try again later".to_string(),
            ));
        }

        let candidate = if identifier.is_empty() {
            None
        } else {
            self.user_repo
                .find_by_login(identifier)
                .await?
                .filter(|u| !u.is_deleted())
        };

        let user = match candidate {
            Some(user) if verify_password(&input.password, &user.password_hash)? => user,
            other => {
                self.limiter.record_failed_attempt(identifier).await;
                self.audit
                    .record(
                        other.map(|u| u.id),
                        "login_failed",
                        "user",
                        None,
                        Some(identifier.to_string()),
                        ip_text.as_deref(),
                    )
                    .await;
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !user.email_verified {
            return Err(ServiceError::forbidden("Email address is not verified"));
        }
        if user.is_suspended() {
            return Err(ServiceError::forbidden("Account is suspended"));
        }
        if user.role < required_role {
            return Err(ServiceError::Forbidden(format!(
                "This login requires the {} role",
                required_role
            )));
        }

        self.limiter.clear_identifier(identifier).await;
        let tokens = self.open_session(user, ip_text.as_deref()).await?;
        self.user_repo.touch_last_login(tokens.user.id).await?;
        self.audit
            .record(
                Some(tokens.user.id),
                "login",
                "user",
                Some(tokens.user.id),
                Some(required_role.to_string()),
                ip_text.as_deref(),
            )
            .await;
        tracing::info!("User {} logged in", tokens.user.username);

        Ok(tokens)
    }

    async fn open_session(&self, user: User, ip: Option<&str>) -> ServiceResult<AuthTokens> {
        let refresh_token = generate_refresh_token();
        let expires_at = Utc::now() + self.tokens.refresh_ttl();
        let session = self
            .session_repo
            .create(user.id, &hash_refresh_token(&refresh_token), ip, expires_at)
            .await?;
        let access_token = self
            .tokens
            .issue(user.id, session.id, &user.role.to_string())?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl().num_seconds(),
            user,
        })
    }

    /// Exchange a refresh token for a new token pair; the old one stops working
    pub async fn refresh(&self, input: RefreshInput, ip: Option<&str>) -> ServiceResult<AuthTokens> {
        let unauthorized = || ServiceError::Unauthorized("Invalid refresh token".to_string());

        let session = self
            .session_repo
            .get_by_token_hash(&hash_refresh_token(input.refresh_token.trim()))
            .await?
            .ok_or_else(unauthorized)?;
        self.session_repo.delete(session.id).await?;
        if session.is_expired() {
            return Err(ServiceError::Unauthorized("Refresh token has expired".to_string()));
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await?
            .filter(|u| !u.is_deleted() && !u.is_suspended())
            .ok_or_else(unauthorized)?;

        self.open_session(user, ip).await
    }

    pub async fn logout(&self, session_id: i64) -> ServiceResult<()> {
        self.session_repo.delete(session_id).await?;
        Ok(())
    }

    /// Resolve an access token to its user and session
    pub async fn authenticate(&self, access_token: &str) -> ServiceResult<AuthContext> {
        let claims = self
            .tokens
            .verify(access_token)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))?;

        let session = self
            .session_repo
            .get_by_id(claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub && !s.is_expired())
            .ok_or_else(|| ServiceError::Unauthorized("Session has ended".to_string()))?;

        let user = self
            .user_repo
            .get_by_id(claims.sub)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;
        if user.is_suspended() {
            return Err(ServiceError::forbidden("Account is suspended"));
        }

        Ok(AuthContext {
            user,
            session_id: session.id,
        })
    }

    pub async fn me(&self, user_id: i64) -> ServiceResult<User> {
        self.load_user(user_id).await
    }

    pub async fn update_profile(&self, user_id: i64, input: UpdateProfileInput) -> ServiceResult<User> {
        let nickname = input.nickname.trim();
        validate_nickname(nickname)?;

        if let Some(existing) = self.user_repo.get_by_nickname(nickname).await? {
            if existing.id != user_id {
                return Err(ServiceError::conflict("Nickname is already taken"));
            }
        }
        self.user_repo.update_nickname(user_id, nickname).await?;
        self.load_user(user_id).await
    }

    /// Change the caller's password and end every other session they have
    pub async fn change_password(
        &self,
        auth: &AuthContext,
        input: ChangePasswordInput,
        ip: Option<&str>,
    ) -> ServiceResult<()> {
        if !verify_password(&input.current_password, &auth.user.password_hash)? {
            return Err(ServiceError::validation("Current password is incorrect"));
        }
        validate_password(&input.new_password, self.password_min_length)
            .map_err(ServiceError::Validation)?;

        let hash = hash_password(&input.new_password)?;
        self.user_repo.update_password(auth.user.id, &hash).await?;
        let revoked = self
            .session_repo
            .delete_by_user_except(auth.user.id, auth.session_id)
            .await?;

        self.audit
            .record(
                Some(auth.user.id),
                "password_change",
                "user",
                Some(auth.user.id),
                Some(format!("revoked {} other sessions", revoked)),
                ip,
            )
            .await;
        Ok(())
    }

    /// Housekeeping: drop refresh sessions past their expiry
    pub async fn cleanup_expired_sessions(&self) -> ServiceResult<u64> {
        Ok(self.session_repo.delete_expired().await?)
    }

    async fn load_user(&self, user_id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::not_found("User"))
    }
}

fn validate_nickname(nickname: &str) -> ServiceResult<()> {
    if nickname.is_empty() {
        return Err(ServiceError::validation("Nickname is required"));
    }
    if nickname.chars().count() > 32 {
        return Err(ServiceError::validation("Nickname must be at most 32 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::repositories::{
        SqlxAuditRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
        SqlxVerificationRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{UpdateSettingsInput, UserStatus};
    use crate::services::test_support::{insert_user, migrated_pool, TEST_PASSWORD};

    async fn setup() -> (DynDatabasePool, UserService) {
        let pool = migrated_pool().await;
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxVerificationRepository::boxed(pool.clone()),
            Arc::new(SettingsService::new(SqlxSettingsRepository::boxed(pool.clone()))),
            Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone()))),
            TokenService::new(&AuthConfig::default()),
        );
        (pool, service)
    }

    fn join_input(name: &str) -> JoinInput {
        JoinInput {
            email: format!("{}@example.com", name),
            username: name.to_string(),
            nickname: format!("{} nick", name),
            password: TEST_PASSWORD.to_string(),
        }
    }

    async fn settings(pool: &DynDatabasePool, input: UpdateSettingsInput) {
        SettingsService::new(SqlxSettingsRepository::boxed(pool.clone()))
            .update_board_settings(&input)
            .await
            .expect("Failed to update settings");
    }

    #[tokio::test]
    async fn test_first_member_becomes_verified_admin() {
        let (_pool, service) = setup().await;

        let first = service.join(join_input("founder"), None).await.expect("Failed to join");
        assert_eq!(first.user.role, UserRole::Administrator);
        assert!(first.user.email_verified);
        assert!(!first.verification_required);

        let second = service.join(join_input("member"), None).await.expect("Failed to join");
        assert_eq!(second.user.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_join_rejects_duplicates() {
        let (_pool, service) = setup().await;
        service.join(join_input("alice"), None).await.expect("Failed to join");

        let mut same_email = join_input("alice2");
        same_email.email = "ALICE@example.com".to_string();
        assert!(matches!(
            service.join(same_email, None).await,
            Err(ServiceError::Conflict(_))
        ));

        let mut same_username = join_input("alice");
        same_username.email = "other@example.com".to_string();
        same_username.nickname = "other".to_string();
        assert!(matches!(
            service.join(same_username, None).await,
            Err(ServiceError::Conflict(_))
        ));

        let mut same_nickname = join_input("bob");
        same_nickname.nickname = "alice nick".to_string();
        assert!(matches!(
            service.join(same_nickname, None).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_join_validation() {
        let (_pool, service) = setup().await;

        let mut bad_email = join_input("carol");
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(service.join(bad_email, None).await, Err(ServiceError::Validation(_))));

        let mut short_password = join_input("carol");
        short_password.password = "short".to_string();
        assert!(matches!(
            service.join(short_password, None).await,
            Err(ServiceError::Validation(_))
        ));

        let mut blank = join_input("carol");
        blank.nickname = "   ".to_string();
        assert!(matches!(service.join(blank, None).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_closed_registration() {
        let (pool, service) = setup().await;
        service.join(join_input("founder"), None).await.expect("Failed to join");
        settings(
            &pool,
            UpdateSettingsInput {
                allow_registration: Some(false),
                ..Default::default()
            },
        )
        .await;

        assert!(matches!(
            service.join(join_input("late"), None).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_email_verification_flow() {
        let (pool, service) = setup().await;
        service.join(join_input("founder"), None).await.expect("Failed to join");
        settings(
            &pool,
            UpdateSettingsInput {
                require_email_verification: Some(true),
                ..Default::default()
            },
        )
        .await;

        let joined = service.join(join_input("dave"), None).await.expect("Failed to join");
        assert!(joined.verification_required);
        assert!(!joined.user.email_verified);

        let denied = service
            .login(LoginInput::new("dave", TEST_PASSWORD), UserRole::Member, None)
            .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let wrong = service
            .verify_email(VerifyEmailInput {
                email: "dave@example.com".into(),
                code: "not-it".into(),
            })
            .await;
        assert!(matches!(wrong, Err(ServiceError::Validation(_))));

        let pending = SqlxVerificationRepository::new(pool.clone())
            .latest_for_user(joined.user.id)
            .await
            .expect("Failed to load code")
            .expect("Code should exist");
        assert_eq!(pending.code.len(), 6);

        let verified = service
            .verify_email(VerifyEmailInput {
                email: "Dave@Example.com".into(),
                code: pending.code,
            })
            .await
            .expect("Failed to verify");
        assert!(verified.email_verified);

        service
            .login(LoginInput::new("dave", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Verified member can log in");

        let resend = service
            .resend_verification(ResendVerificationInput {
                email: "dave@example.com".into(),
            })
            .await;
        assert!(matches!(resend, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_by_email_or_username() {
        let (pool, service) = setup().await;
        insert_user(&pool, "erin", UserRole::Member).await;

        let by_name = service
            .login(LoginInput::new("erin", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Login by username");
        assert_eq!(by_name.token_type, "Bearer");
        assert!(by_name.user.last_login_at.is_none());

        service
            .login(LoginInput::new("ERIN@example.com", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Login by email");

        let me = service.me(by_name.user.id).await.expect("Failed to load");
        assert!(me.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let (pool, service) = setup().await;
        insert_user(&pool, "frank", UserRole::Member).await;

        let wrong = service
            .login(LoginInput::new("frank", "wrong-password"), UserRole::Member, None)
            .await;
        match wrong {
            Err(ServiceError::Unauthorized(msg)) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("Expected Unauthorized, got {:?}", other.map(|t| t.user.id)),
        }

        let missing = service
            .login(LoginInput::new("nobody", TEST_PASSWORD), UserRole::Member, None)
            .await;
        assert!(matches!(missing, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_failed_logins_are_rate_limited() {
        let (pool, service) = setup().await;
        insert_user(&pool, "gina", UserRole::Member).await;

        for _ in 0..5 {
            let _ = service
                .login(LoginInput::new("gina", "wrong-password"), UserRole::Member, None)
                .await;
        }
        let limited = service
            .login(LoginInput::new("gina", TEST_PASSWORD), UserRole::Member, None)
            .await;
        assert!(matches!(limited, Err(ServiceError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_suspended_cannot_log_in() {
        let (pool, service) = setup().await;
        let user = insert_user(&pool, "hank", UserRole::Member).await;
        SqlxUserRepository::new(pool.clone())
            .update_status(user.id, UserStatus::Suspended)
            .await
            .expect("Failed to suspend");

        let result = service
            .login(LoginInput::new("hank", TEST_PASSWORD), UserRole::Member, None)
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_role_restricted_login() {
        let (pool, service) = setup().await;
        insert_user(&pool, "ivy", UserRole::Member).await;
        insert_user(&pool, "mod", UserRole::Moderator).await;

        let member_as_mod = service
            .login(LoginInput::new("ivy", TEST_PASSWORD), UserRole::Moderator, None)
            .await;
        assert!(matches!(member_as_mod, Err(ServiceError::Forbidden(_))));

        service
            .login(LoginInput::new("mod", TEST_PASSWORD), UserRole::Moderator, None)
            .await
            .expect("Moderator login");
        let mod_as_admin = service
            .login(LoginInput::new("mod", TEST_PASSWORD), UserRole::Administrator, None)
            .await;
        assert!(matches!(mod_as_admin, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_authenticate_refresh_and_logout() {
        let (pool, service) = setup().await;
        insert_user(&pool, "jane", UserRole::Member).await;

        let tokens = service
            .login(LoginInput::new("jane", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Login");
        let ctx = service.authenticate(&tokens.access_token).await.expect("Authenticate");
        assert_eq!(ctx.user.username, "jane");

        let rotated = service
            .refresh(
                RefreshInput {
                    refresh_token: tokens.refresh_token.clone(),
                },
                None,
            )
            .await
            .expect("Refresh");
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        // The old refresh token and its session are gone
        let reused = service
            .refresh(
                RefreshInput {
                    refresh_token: tokens.refresh_token,
                },
                None,
            )
            .await;
        assert!(matches!(reused, Err(ServiceError::Unauthorized(_))));
        assert!(matches!(
            service.authenticate(&tokens.access_token).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let ctx = service.authenticate(&rotated.access_token).await.expect("Authenticate");
        service.logout(ctx.session_id).await.expect("Logout");
        assert!(matches!(
            service.authenticate(&rotated.access_token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let (pool, service) = setup().await;
        insert_user(&pool, "kate", UserRole::Member).await;

        let laptop = service
            .login(LoginInput::new("kate", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Login");
        let phone = service
            .login(LoginInput::new("kate", TEST_PASSWORD), UserRole::Member, None)
            .await
            .expect("Login");
        let ctx = service.authenticate(&laptop.access_token).await.expect("Authenticate");

        let wrong = service
            .change_password(
                &ctx,
                ChangePasswordInput {
                    current_password: "nope-nope".into(),
                    new_password: "new-password-1".into(),
                },
                None,
            )
            .await;
        assert!(matches!(wrong, Err(ServiceError::Validation(_))));

        service
            .change_password(
                &ctx,
                ChangePasswordInput {
                    current_password: TEST_PASSWORD.into(),
                    new_password: "new-password-1".into(),
                },
                None,
            )
            .await
            .expect("Change password");

        service.authenticate(&laptop.access_token).await.expect("Current session survives");
        assert!(service.authenticate(&phone.access_token).await.is_err());

        service
            .login(LoginInput::new("kate", "new-password-1"), UserRole::Member, None)
            .await
            .expect("Login with new password");
    }

    #[tokio::test]
    async fn test_update_profile_nickname_unique() {
        let (pool, service) = setup().await;
        let lee = insert_user(&pool, "lee", UserRole::Member).await;
        insert_user(&pool, "max", UserRole::Member).await;

        let taken = service
            .update_profile(lee.id, UpdateProfileInput { nickname: "max nick".into() })
            .await;
        assert!(matches!(taken, Err(ServiceError::Conflict(_))));

        let updated = service
            .update_profile(lee.id, UpdateProfileInput { nickname: " Lee L. ".into() })
            .await
            .expect("Update");
        assert_eq!(updated.nickname, "Lee L.");
    }
}
