//! Tag model
//!
//! Tags are created on demand when a post names them and are stored in
//! normalized (trimmed, lower-case) form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Tag with the number of visible posts carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

/// Normalize a tag name: trim, collapse inner whitespace, lower-case.
/// Returns `None` for names that are empty after normalization.
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
