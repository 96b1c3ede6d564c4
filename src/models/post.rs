//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UserSummary;

/// Discussion post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub body: String,
    /// Hidden by a moderator; invisible on public lists
    pub is_hidden: bool,
    /// Locked posts accept no new comments
    pub is_locked: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Visible on public endpoints
    pub fn is_visible(&self) -> bool {
        !self.is_deleted() && !self.is_hidden
    }
}

/// Post with author, tags and counters for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub tags: Vec<String>,
    pub comment_count: i64,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Sort order for post lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    /// Most viewed first
    Popular,
}

impl PostSort {
    pub fn order_clause(&self) -> &'static str {
        match self {
            PostSort::Newest => "p.created_at DESC, p.id DESC",
            PostSort::Oldest => "p.created_at ASC, p.id ASC",
            PostSort::Popular => "p.view_count DESC, p.created_at DESC, p.id DESC",
        }
    }
}

impl fmt::Display for PostSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostSort::Newest => write!(f, "newest"),
            PostSort::Oldest => write!(f, "oldest"),
            PostSort::Popular => write!(f, "popular"),
        }
    }
}

impl FromStr for PostSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(PostSort::Newest),
            "oldest" => Ok(PostSort::Oldest),
            "popular" => Ok(PostSort::Popular),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Filters for the public post list
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Normalized tag name
    pub tag: Option<String>,
    /// Case-insensitive substring on title or body
    pub search: Option<String>,
    pub sort: PostSort,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating a post; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<i64>,
    pub tags: Option<Vec<String>>,
}
