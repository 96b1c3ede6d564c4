//! Forbidden word model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenWord {
    pub id: i64,
    /// Stored lower-case
    pub word: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
