//! Store error taxonomy.

use forum_types::models::InvalidReaction;
use rusqlite::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness, check or foreign-key constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidValue(#[from] InvalidReaction),

    /// The store could not be reached: busy, locked, unopenable or a
    /// poisoned connection lock.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            match code.code {
                ErrorCode::ConstraintViolation => {
                    return DbError::Conflict(message.clone().unwrap_or_else(|| code.to_string()));
                }
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly => return DbError::Unavailable(err.to_string()),
                _ => {}
            }
        }
        DbError::Storage(err)
    }
}
