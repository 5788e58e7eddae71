use axum::{
    Extension, Json,
    extract::{Path, State},
};
use forum_db::{DbError, PostFilter};
use forum_types::api::CategoryPostsResponse;
use forum_types::models::Category;

use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::posts::fetch_posts;
use crate::state::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = blocking(move || Ok(state.db.list_categories()?)).await?;
    Ok(Json(categories))
}

pub async fn category_posts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(category_id): Path<i64>,
) -> Result<Json<CategoryPostsResponse>, ApiError> {
    let lookup = state.clone();
    let category = blocking(move || {
        Ok(lookup
            .db
            .get_category(category_id)?
            .ok_or(DbError::NotFound("category"))?)
    })
    .await?;

    let filter = PostFilter {
        category_id: Some(category.id),
        ..Default::default()
    };
    let posts = fetch_posts(state, filter, current.0.map(|user| user.id)).await?;

    Ok(Json(CategoryPostsResponse { category, posts }))
}
