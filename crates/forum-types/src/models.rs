use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Raised when a reaction value is anything other than 1 or -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reaction must be 1 (like) or -1 (dislike), got {0}")]
pub struct InvalidReaction(pub i64);

/// A user's stance on a post or comment.
///
/// There is no neutral variant: a user with no opinion simply has no
/// reaction row, so `Option<ReactionValue>` is the full tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ReactionValue {
    Like,
    Dislike,
}

impl ReactionValue {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
        }
    }
}

impl TryFrom<i64> for ReactionValue {
    type Error = InvalidReaction;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Like),
            -1 => Ok(Self::Dislike),
            other => Err(InvalidReaction(other)),
        }
    }
}

impl From<ReactionValue> for i64 {
    fn from(value: ReactionValue) -> Self {
        value.as_i64()
    }
}

/// What a reaction is attached to. Each kind has its own reaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Post,
    Comment,
}

/// Counts derived from the reaction rows at read time, plus the viewer's own
/// reaction (`None` when anonymous or neutral).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub likes: i64,
    pub dislikes: i64,
    pub user_reaction: Option<ReactionValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_value_accepts_only_unit_signs() {
        assert_eq!(ReactionValue::try_from(1), Ok(ReactionValue::Like));
        assert_eq!(ReactionValue::try_from(-1), Ok(ReactionValue::Dislike));
        assert_eq!(ReactionValue::try_from(0), Err(InvalidReaction(0)));
        assert_eq!(ReactionValue::try_from(2), Err(InvalidReaction(2)));
    }

    #[test]
    fn reaction_value_serializes_as_integer() {
        let json = serde_json::to_string(&ReactionValue::Dislike).unwrap();
        assert_eq!(json, "-1");

        let parsed: Result<ReactionValue, _> = serde_json::from_str("5");
        assert!(parsed.is_err());
    }
}
