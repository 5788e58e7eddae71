use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, Uri, header},
    response::Redirect,
};
use forum_types::api::ReactRequest;
use forum_types::models::{SubjectKind, User};
use tracing::debug;

use crate::blocking;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn react_post(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReactRequest>,
) -> Result<Redirect, ApiError> {
    let user_id = user.id;
    let reaction = blocking(move || {
        Ok(state.db.react(SubjectKind::Post, post_id, user_id, req.value)?)
    })
    .await?;

    debug!(post_id, user_id, ?reaction, "Post reaction toggled");
    Ok(Redirect::to(&back_to(&headers, format!("/posts/{post_id}"))))
}

pub async fn react_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReactRequest>,
) -> Result<Redirect, ApiError> {
    let user_id = user.id;
    let (reaction, post_id) = blocking(move || {
        let reaction = state
            .db
            .react(SubjectKind::Comment, comment_id, user_id, req.value)?;
        let post_id = state.db.get_comment(comment_id, None)?.map(|c| c.post_id);
        Ok((reaction, post_id))
    })
    .await?;

    debug!(comment_id, user_id, ?reaction, "Comment reaction toggled");
    let fallback = post_id.map_or_else(|| "/".to_string(), |id| format!("/posts/{id}"));
    Ok(Redirect::to(&back_to(&headers, fallback)))
}

/// Path (and query) of the `Referer`, so redirects stay on this site.
fn back_to(headers: &HeaderMap, fallback: String) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| referer.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .filter(|path| path.starts_with('/'))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_referer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn referer_is_reduced_to_its_path() {
        let headers = with_referer("http://forum.local/posts/7?page=2");
        assert_eq!(back_to(&headers, "/posts/1".into()), "/posts/7?page=2");

        let headers = with_referer("https://elsewhere.example/phish");
        assert_eq!(back_to(&headers, "/posts/1".into()), "/phish");
    }

    #[test]
    fn missing_or_unusable_referer_falls_back() {
        assert_eq!(back_to(&HeaderMap::new(), "/posts/3".into()), "/posts/3");

        let headers = with_referer("not a uri");
        assert_eq!(back_to(&headers, "/posts/3".into()), "/posts/3");
    }
}
