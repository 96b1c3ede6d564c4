//! User model
//!
//! A single `users` table holds members, moderators and administrators;
//! the role decides which parts of the board an account can reach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub nickname: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Administrator
    }

    /// Moderators and administrators both count as staff
    pub fn is_moderator(&self) -> bool {
        self.role >= UserRole::Moderator
    }

    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if the user may edit content owned by `author_id`
    pub fn can_moderate(&self, author_id: i64) -> bool {
        self.is_moderator() || self.id == author_id
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            role: self.role,
            avatar_url: gravatar_url(&self.email),
        }
    }
}

/// Public author information embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub role: UserRole,
    pub avatar_url: String,
}

/// Generate Gravatar URL from email
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
    }
    let hash = format!("{:x}", md5::compute(email.to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
}

/// Account role. Variants are declared from least to most privileged so the
/// derived ordering can be used for "at least" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Member,
    Moderator,
    Administrator,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Member => write!(f, "member"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Administrator => write!(f, "administrator"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(UserRole::Member),
            "moderator" => Ok(UserRole::Moderator),
            "administrator" | "admin" => Ok(UserRole::Administrator),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    /// Cannot log in; existing sessions are revoked
    Suspended,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(anyhow::anyhow!("Invalid user status: {}", s)),
        }
    }
}

/// Row data for inserting a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: UserRole,
    pub email_verified: bool,
}

/// Filters for the administrator user list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    /// Case-insensitive match on email, username or nickname
    pub search: Option<String>,
}
