use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use forum_db::DbError;
use forum_types::api::{CommentResponse, CreateCommentRequest};
use forum_types::models::User;
use tracing::info;

use crate::blocking;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::validation(["Comment cannot be empty"]));
    }

    let author_id = user.id;
    let comment = blocking(move || {
        let comment_id = state.db.create_comment(post_id, author_id, &content)?;
        let comment = state
            .db
            .get_comment(comment_id, Some(author_id))?
            .ok_or(DbError::NotFound("comment"))?;
        Ok(CommentResponse::from(comment))
    })
    .await?;

    info!(comment_id = comment.id, post_id, author_id, "Comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}
