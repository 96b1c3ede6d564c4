//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// Comment on a post. Top-level comments have depth 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub depth: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Comment in a thread. Deleted comments that still have visible replies
/// are kept as placeholders with no content or author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub depth: i64,
    pub content: Option<String>,
    pub author: Option<UserSummary>,
    pub is_deleted: bool,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<CommentNode>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub content: String,
}

/// Input for editing a comment
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentInput {
    pub content: String,
}
