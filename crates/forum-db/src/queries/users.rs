use rusqlite::{Connection, OptionalExtension};

use crate::models::UserRow;
use crate::{Database, DbError, Result};

const USER_COLUMNS: &str = "id, username, email, password, created_at";

impl Database {
    /// Insert a new account. Username and email are checked inside the same
    /// transaction as the insert so the caller gets a precise conflict message.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.transaction(|conn| {
            if exists(conn, "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)", username)? {
                return Err(DbError::Conflict("username already taken".into()));
            }
            if exists(conn, "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)", email)? {
                return Err(DbError::Conflict("email already registered".into()));
            }

            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                id,
            )
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                email,
            )
        })
    }
}

fn exists(conn: &Connection, sql: &str, value: &str) -> Result<bool> {
    Ok(conn.query_row(sql, [value], |row| row.get(0))?)
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, sql: &str, key: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::DbError;
    use crate::test_support::open_temp;

    #[test]
    fn create_and_fetch_user() {
        let (_dir, db) = open_temp();

        let id = db.create_user("alice", "alice@example.com", "digest").unwrap();
        assert!(id > 0);

        let by_id = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.password, "digest");

        let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);

        assert!(db.get_user_by_id(9999).unwrap().is_none());
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_and_email_are_conflicts() {
        let (_dir, db) = open_temp();
        db.create_user("alice", "alice@example.com", "digest").unwrap();

        let err = db.create_user("alice", "other@example.com", "digest").unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m == "username already taken"));

        let err = db.create_user("bob", "alice@example.com", "digest").unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m == "email already registered"));
    }
}
