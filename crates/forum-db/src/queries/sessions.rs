use rusqlite::OptionalExtension;
use tracing::debug;

use crate::models::SessionRow;
use crate::{Database, Result};

impl Database {
    /// Drop every session the user holds and insert the new one, as one unit.
    /// No reader can observe the user with two sessions, or with none.
    pub fn replace_session(&self, id: &str, user_id: i64, expires_at: i64) -> Result<()> {
        self.transaction(|conn| {
            let superseded = conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?;
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, expires_at],
            )?;

            if superseded > 0 {
                debug!(user_id, superseded, "Superseded existing sessions");
            }
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, expires_at FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Remove one session only if it has expired as of `now`.
    pub fn delete_expired_session(&self, id: &str, now: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE id = ?1 AND expires_at <= ?2",
                rusqlite::params![id, now],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn delete_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?)
        })
    }
}
