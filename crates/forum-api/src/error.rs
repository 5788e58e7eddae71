use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forum_db::DbError;
use forum_types::api::ErrorResponse;
use forum_types::models::InvalidReaction;
use tracing::error;

use crate::password::PasswordError;
use crate::sessions::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request failed input validation; each detail is one user-facing message.
    #[error("validation failed")]
    Validation(Vec<String>),

    #[error(transparent)]
    InvalidValue(#[from] InvalidReaction),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation(messages.into_iter().map(Into::into).collect())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(entity) => Self::NotFound(entity),
            DbError::Conflict(message) => Self::Conflict(message),
            DbError::InvalidValue(invalid) => Self::InvalidValue(invalid),
            other @ (DbError::Unavailable(_) | DbError::Storage(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(db) => db.into(),
            // Only reachable when a handler insists on a live session.
            SessionError::NotFound | SessionError::Expired => Self::InvalidCredentials,
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::Validation(details) => {
                (StatusCode::BAD_REQUEST, "validation failed".to_string(), details)
            }
            Self::InvalidValue(invalid) => (StatusCode::BAD_REQUEST, invalid.to_string(), vec![]),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid email or password".to_string(), vec![])
            }
            Self::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity} not found"), vec![]),
            Self::Conflict(message) => (StatusCode::CONFLICT, message, vec![]),
            Self::Internal(message) => {
                error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string(), vec![])
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
