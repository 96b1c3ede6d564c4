//! Post subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    /// Title of the followed post, filled in on listing
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_title: Option<String>,
    pub created_at: DateTime<Utc>,
}
