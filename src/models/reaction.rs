//! Reaction model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TargetType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionKind::Like => write!(f, "like"),
            ReactionKind::Dislike => write!(f, "dislike"),
        }
    }
}

impl FromStr for ReactionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            _ => Err(anyhow::anyhow!("Invalid reaction kind: {}", s)),
        }
    }
}

/// One member's reaction to a post or comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated reactions for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub target_type: TargetType,
    pub target_id: i64,
    pub likes: i64,
    pub dislikes: i64,
    /// The caller's own reaction, when authenticated
    pub my_reaction: Option<ReactionKind>,
}

/// Input for reacting to a target
#[derive(Debug, Clone, Deserialize)]
pub struct ReactInput {
    pub target_type: TargetType,
    pub target_id: i64,
    pub kind: ReactionKind,
}

/// Identifies the target when removing a reaction
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionTarget {
    pub target_type: TargetType,
    pub target_id: i64,
}
