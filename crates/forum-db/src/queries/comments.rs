use rusqlite::{OptionalExtension, Row};

use crate::models::CommentRow;
use crate::{Database, Result};

// ?1 is always the viewer.
const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.content, c.user_id, u.username, c.created_at,
        (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id AND r.value = 1),
        (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id AND r.value = -1),
        (SELECT r.value FROM comment_reactions r WHERE r.comment_id = c.id AND r.user_id = ?1)
    FROM comments c
    JOIN users u ON u.id = c.user_id";

impl Database {
    pub fn create_comment(&self, post_id: i64, author_id: i64, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (content, user_id, post_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![content, author_id, post_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, id: i64, viewer_id: Option<i64>) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{COMMENT_SELECT} WHERE c.id = ?2"),
                    rusqlite::params![viewer_id, id],
                    map_comment,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Oldest first.
    pub fn list_comments(&self, post_id: i64, viewer_id: Option<i64>) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?2 ORDER BY c.created_at ASC, c.id ASC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![viewer_id, post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        created_at: row.get(5)?,
        likes: row.get(6)?,
        dislikes: row.get(7)?,
        user_reaction: row.get(8)?,
    })
}
