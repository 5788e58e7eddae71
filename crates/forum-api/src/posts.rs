use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use forum_db::{DbError, PostFilter};
use forum_types::api::{CreatePostRequest, PostDetailResponse, PostQuery, PostResponse};
use forum_types::models::User;
use tracing::info;

use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let filter = PostFilter {
        category_id: query.category,
        ..Default::default()
    };
    let viewer = current.0.map(|user| user.id);
    fetch_posts(state, filter, viewer).await.map(Json)
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let viewer = current.0.map(|user| user.id);

    let detail = blocking(move || {
        let post = state
            .db
            .get_post(post_id, viewer)?
            .ok_or(DbError::NotFound("post"))?;
        let comments = state.db.list_comments(post_id, viewer)?;
        Ok(PostDetailResponse {
            post: post.into(),
            comments: comments.into_iter().map(Into::into).collect(),
        })
    })
    .await?;

    Ok(Json(detail))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();

    let mut errors = Vec::new();
    if title.is_empty() {
        errors.push("Title is required");
    }
    if content.is_empty() {
        errors.push("Content is required");
    }
    if req.category_ids.is_empty() {
        errors.push("Select at least one category");
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let category_ids = req.category_ids;
    let author_id = user.id;
    let post = blocking(move || {
        let post_id = state.db.create_post(&title, &content, author_id, &category_ids)?;
        let post = state
            .db
            .get_post(post_id, Some(author_id))?
            .ok_or(DbError::NotFound("post"))?;
        Ok(PostResponse::from(post))
    })
    .await?;

    info!(post_id = post.id, author_id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// Posts written by the signed-in user.
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let filter = PostFilter {
        author_id: Some(user.id),
        ..Default::default()
    };
    fetch_posts(state, filter, Some(user.id)).await.map(Json)
}

/// Posts the signed-in user currently likes.
pub async fn liked_posts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let filter = PostFilter {
        liked_by: Some(user.id),
        ..Default::default()
    };
    fetch_posts(state, filter, Some(user.id)).await.map(Json)
}

pub(crate) async fn fetch_posts(
    state: AppState,
    filter: PostFilter,
    viewer: Option<i64>,
) -> Result<Vec<PostResponse>, ApiError> {
    blocking(move || {
        let rows = state.db.list_posts(filter, viewer)?;
        Ok(rows.into_iter().map(PostResponse::from).collect())
    })
    .await
}
