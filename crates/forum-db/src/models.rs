//! Database row types. These map directly to SQLite rows and are converted
//! into the forum-types models at the edge of the store.

use chrono::{DateTime, NaiveDateTime, Utc};
use forum_types::api::{CommentResponse, PostResponse};
use forum_types::models::{Category, ReactionSummary, ReactionValue, User};
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    /// Unix timestamp, seconds.
    pub expires_at: i64,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_reaction: Option<i64>,
    pub categories: Vec<Category>,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_reaction: Option<i64>,
}

/// SQLite's `datetime('now')` stores "YYYY-MM-DD HH:MM:SS" without a zone.
/// Parse as naive UTC; fall back to RFC 3339 for rows written elsewhere.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn summary(likes: i64, dislikes: i64, user_reaction: Option<i64>) -> ReactionSummary {
    ReactionSummary {
        likes,
        dislikes,
        user_reaction: user_reaction.and_then(|v| ReactionValue::try_from(v).ok()),
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl From<PostRow> for PostResponse {
    fn from(row: PostRow) -> Self {
        PostResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            author_username: row.author_username,
            created_at: parse_timestamp(&row.created_at),
            categories: row.categories,
            reactions: summary(row.likes, row.dislikes, row.user_reaction),
        }
    }
}

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        CommentResponse {
            id: row.id,
            post_id: row.post_id,
            content: row.content,
            author_id: row.author_id,
            author_username: row.author_username,
            created_at: parse_timestamp(&row.created_at),
            reactions: summary(row.likes, row.dislikes, row.user_reaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_datetime_as_utc() {
        let ts = parse_timestamp("2024-03-05 14:30:09");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 30, 9));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }
}
