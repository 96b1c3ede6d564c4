//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone commented on your post
    PostComment,
    /// Someone replied to your comment
    CommentReply,
    /// New comment on a post you follow
    SubscribedPost,
    /// A moderator acted on your content or account
    Moderation,
    /// One of your reports changed status
    ReportUpdate,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PostComment => "post_comment",
            Self::CommentReply => "comment_reply",
            Self::SubscribedPost => "subscribed_post",
            Self::Moderation => "moderation",
            Self::ReportUpdate => "report_update",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_comment" => Ok(Self::PostComment),
            "comment_reply" => Ok(Self::CommentReply),
            "subscribed_post" => Ok(Self::SubscribedPost),
            "moderation" => Ok(Self::Moderation),
            "report_update" => Ok(Self::ReportUpdate),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row data for a new notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub actor_id: Option<i64>,
}
