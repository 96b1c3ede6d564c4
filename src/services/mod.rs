//! Services layer - Business logic
//!
//! This module contains the business logic of the discussion board.
//! Services are responsible for:
//! - Implementing business rules (ownership, roles, time windows)
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod admin;
pub mod audit;
pub mod category;
pub mod comment;
pub mod content_filter;
pub mod email;
pub mod error;
pub mod export;
pub mod moderation;
pub mod notification;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod reaction;
pub mod report;
pub mod settings;
pub mod subscription;
pub mod tag;
pub mod token;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::AdminService;
pub use audit::AuditService;
pub use category::{generate_slug, CategoryService};
pub use comment::CommentService;
pub use content_filter::{find_forbidden_word, ContentFilterService};
pub use email::{generate_verification_code, EmailService};
pub use error::{ServiceError, ServiceResult};
pub use export::ExportService;
pub use moderation::ModerationService;
pub use notification::NotificationService;
pub use password::{hash_password, validate_password, verify_password};
pub use post::PostService;
pub use rate_limiter::LoginRateLimiter;
pub use reaction::ReactionService;
pub use report::ReportService;
pub use settings::SettingsService;
pub use subscription::SubscriptionService;
pub use tag::TagService;
pub use token::{Claims, TokenService};
pub use user::{
    AuthContext, AuthTokens, ChangePasswordInput, JoinInput, JoinOutcome, LoginInput,
    RefreshInput, ResendVerificationInput, UpdateProfileInput, UserService, VerifyEmailInput,
};
