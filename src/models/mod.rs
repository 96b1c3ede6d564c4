//! Data models
//!
//! Database entities, list filters and the input types accepted by the
//! services.

mod audit;
mod category;
mod comment;
mod export;
mod forbidden_word;
mod moderation;
mod notification;
mod pagination;
mod post;
mod reaction;
mod report;
mod session;
pub mod settings;
mod subscription;
mod tag;
mod target;
mod user;

pub use audit::{AuditFilter, AuditLog, NewAuditLog};
pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{Comment, CommentNode, CreateCommentInput, UpdateCommentInput};
pub use export::{ExportLog, UserDataExport};
pub use forbidden_word::ForbiddenWord;
pub use moderation::{ApplyModerationInput, ModerationAction, ModerationActionKind, ModerationFilter};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use pagination::{ListParams, PagedResult};
pub use post::{CreatePostInput, Post, PostDetail, PostFilter, PostSort, UpdatePostInput};
pub use reaction::{ReactInput, Reaction, ReactionKind, ReactionSummary, ReactionTarget};
pub use report::{CreateReportInput, Report, ReportFilter, ReportStatus, UpdateReportStatusInput};
pub use session::{EmailVerification, Session};
pub use settings::{BoardSettings, UpdateSettingsInput};
pub use subscription::Subscription;
pub use tag::{normalize_tag_name, Tag, TagWithCount};
pub use target::TargetType;
pub use user::{gravatar_url, NewUser, User, UserFilter, UserRole, UserStatus, UserSummary};
