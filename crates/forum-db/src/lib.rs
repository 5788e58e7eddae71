pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

pub use error::{DbError, Result};
pub use queries::posts::PostFilter;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Forum store: one writer connection plus a small pool of read-only readers.
///
/// Every mutation goes through the writer, so multi-statement sequences run
/// inside [`Database::transaction`] and can never interleave with each other.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode so readers never block on the writer
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| DbError::Unavailable(format!("reader lock poisoned: {e}")))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| DbError::Unavailable(format!("writer lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run `f` on the writer inside `BEGIN IMMEDIATE`. Commits when `f`
    /// returns `Ok`; any error rolls the whole unit back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| DbError::Unavailable(format!("writer lock poisoned: {e}")))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::TempDir;

    /// A fresh store in its own temp directory. Keep the `TempDir` alive for
    /// as long as the database is used.
    pub fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("forum.db")).unwrap();
        (dir, db)
    }

    pub fn insert_user(db: &Database, id: i64, name: &str) {
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, 'digest')",
                rusqlite::params![id, name, format!("{name}@example.com")],
            )?;
            Ok(())
        })
        .unwrap();
    }

    pub fn insert_post(db: &Database, id: i64, author_id: i64) {
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, content, user_id) VALUES (?1, 'title', 'content', ?2)",
                rusqlite::params![id, author_id],
            )?;
            Ok(())
        })
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::open_temp;
    use crate::DbError;

    #[test]
    fn failed_transaction_rolls_back() {
        let (_dir, db) = open_temp();

        let result: crate::Result<()> = db.transaction(|conn| {
            conn.execute("INSERT INTO categories (name) VALUES ('Rust')", [])?;
            Err(DbError::Conflict("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM categories WHERE name = 'Rust'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn reopening_keeps_schema_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forum.db");

        {
            let db = crate::Database::open(&path).unwrap();
            db.create_category("Rust").unwrap();
        }

        let db = crate::Database::open(&path).unwrap();
        assert!(db.category_exists("Rust").unwrap());
    }
}
