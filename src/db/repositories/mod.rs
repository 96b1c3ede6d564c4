//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one table or a small group of
//! closely related tables.

pub mod audit;
pub mod category;
pub mod comment;
pub mod export_log;
pub mod forbidden_word;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod reaction;
pub mod report;
pub mod session;
pub mod settings;
pub mod subscription;
pub mod tag;
pub mod user;
pub mod verification;

pub use audit::{AuditRepository, SqlxAuditRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use export_log::{ExportLogRepository, SqlxExportLogRepository};
pub use forbidden_word::{ForbiddenWordRepository, SqlxForbiddenWordRepository};
pub use moderation::{ModerationRepository, NewModerationAction, SqlxModerationRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use reaction::{ReactionRepository, SqlxReactionRepository};
pub use report::{ReportRepository, SqlxReportRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use verification::{SqlxVerificationRepository, VerificationRepository};

/// Lower-cased text that substring search matches against.
///
/// Folding happens here rather than in SQL because SQLite's `lower()` only
/// handles ASCII.
pub(crate) fn search_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Needle for [`search_key`] columns, matched with `instr` so `%` and `_`
/// stay literal.
pub(crate) fn search_needle(search: &str) -> String {
    search.trim().to_lowercase()
}
