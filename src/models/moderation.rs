//! Moderation action model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TargetType;

/// Action a moderator can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationActionKind {
    HidePost,
    RestorePost,
    LockPost,
    UnlockPost,
    DeleteComment,
    RestoreComment,
    WarnUser,
    SuspendUser,
    UnsuspendUser,
}

impl ModerationActionKind {
    /// Entity the action applies to
    pub fn target_type(&self) -> TargetType {
        match self {
            Self::HidePost | Self::RestorePost | Self::LockPost | Self::UnlockPost => {
                TargetType::Post
            }
            Self::DeleteComment | Self::RestoreComment => TargetType::Comment,
            Self::WarnUser | Self::SuspendUser | Self::UnsuspendUser => TargetType::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HidePost => "hide_post",
            Self::RestorePost => "restore_post",
            Self::LockPost => "lock_post",
            Self::UnlockPost => "unlock_post",
            Self::DeleteComment => "delete_comment",
            Self::RestoreComment => "restore_comment",
            Self::WarnUser => "warn_user",
            Self::SuspendUser => "suspend_user",
            Self::UnsuspendUser => "unsuspend_user",
        }
    }
}

impl fmt::Display for ModerationActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationActionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hide_post" => Ok(Self::HidePost),
            "restore_post" => Ok(Self::RestorePost),
            "lock_post" => Ok(Self::LockPost),
            "unlock_post" => Ok(Self::UnlockPost),
            "delete_comment" => Ok(Self::DeleteComment),
            "restore_comment" => Ok(Self::RestoreComment),
            "warn_user" => Ok(Self::WarnUser),
            "suspend_user" => Ok(Self::SuspendUser),
            "unsuspend_user" => Ok(Self::UnsuspendUser),
            _ => Err(anyhow::anyhow!("Invalid moderation action: {}", s)),
        }
    }
}

/// Recorded moderation action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: i64,
    pub moderator_id: i64,
    pub action: ModerationActionKind,
    pub target_type: TargetType,
    pub target_id: i64,
    /// Owner of the affected content, or the affected user
    pub target_user_id: Option<i64>,
    pub reason: String,
    pub report_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyModerationInput {
    pub action: ModerationActionKind,
    pub target_id: i64,
    pub reason: String,
    #[serde(default)]
    pub report_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationFilter {
    pub moderator_id: Option<i64>,
    pub action: Option<ModerationActionKind>,
    pub target_type: Option<TargetType>,
    pub target_user_id: Option<i64>,
}
