use forum_types::models::{ReactionSummary, ReactionValue, SubjectKind};
use rusqlite::OptionalExtension;

use crate::{Database, Result};

/// Table and subject column holding reactions for each subject kind.
fn reaction_table(kind: SubjectKind) -> (&'static str, &'static str) {
    match kind {
        SubjectKind::Post => ("post_reactions", "post_id"),
        SubjectKind::Comment => ("comment_reactions", "comment_id"),
    }
}

impl Database {
    /// Validate a raw value and toggle. Anything other than 1 or -1 is
    /// rejected before the store is touched.
    pub fn react(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        user_id: i64,
        raw_value: i64,
    ) -> Result<Option<ReactionValue>> {
        let value = ReactionValue::try_from(raw_value)?;
        self.toggle_reaction(kind, subject_id, user_id, value)
    }

    /// Apply the like/dislike toggle and return the user's resulting reaction.
    ///
    /// Same value as the current one removes the row; anything else sets the
    /// requested value. The read and the write share one transaction.
    /// Whether the subject exists is left to the foreign key.
    pub fn toggle_reaction(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        user_id: i64,
        value: ReactionValue,
    ) -> Result<Option<ReactionValue>> {
        let (table, column) = reaction_table(kind);

        self.transaction(|conn| {
            let current: Option<i64> = conn
                .query_row(
                    &format!("SELECT value FROM {table} WHERE {column} = ?1 AND user_id = ?2"),
                    [subject_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            let next = match current {
                Some(existing) if existing == value.as_i64() => {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE {column} = ?1 AND user_id = ?2"),
                        [subject_id, user_id],
                    )?;
                    None
                }
                Some(_) => {
                    conn.execute(
                        &format!("UPDATE {table} SET value = ?3 WHERE {column} = ?1 AND user_id = ?2"),
                        [subject_id, user_id, value.as_i64()],
                    )?;
                    Some(value)
                }
                None => {
                    conn.execute(
                        &format!("INSERT INTO {table} ({column}, user_id, value) VALUES (?1, ?2, ?3)"),
                        [subject_id, user_id, value.as_i64()],
                    )?;
                    Some(value)
                }
            };

            Ok(next)
        })
    }

    /// Like/dislike counts and the viewer's own reaction, counted from the rows.
    pub fn reaction_summary(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<ReactionSummary> {
        let (table, column) = reaction_table(kind);

        self.with_conn(|conn| {
            let (likes, dislikes, own): (i64, i64, Option<i64>) = conn.query_row(
                &format!(
                    "SELECT
                        (SELECT COUNT(*) FROM {table} WHERE {column} = ?1 AND value = 1),
                        (SELECT COUNT(*) FROM {table} WHERE {column} = ?1 AND value = -1),
                        (SELECT value FROM {table} WHERE {column} = ?1 AND user_id = ?2)"
                ),
                rusqlite::params![subject_id, viewer_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            Ok(ReactionSummary {
                likes,
                dislikes,
                user_reaction: own.map(ReactionValue::try_from).transpose()?,
            })
        })
    }
}
