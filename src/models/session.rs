//! Session and email verification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login session. The refresh token itself is never stored, only its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Pending email verification code
#[derive(Debug, Clone)]
pub struct EmailVerification {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl EmailVerification {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
