//! Data export model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, Post, Reaction, Report, Subscription, User};

/// Record of a user-data export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportLog {
    pub id: i64,
    pub requested_by: i64,
    pub subject_user_id: i64,
    pub format: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the board stores about one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDataExport {
    pub generated_at: DateTime<Utc>,
    pub profile: User,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub reports: Vec<Report>,
    pub reactions: Vec<Reaction>,
    pub subscriptions: Vec<Subscription>,
}
