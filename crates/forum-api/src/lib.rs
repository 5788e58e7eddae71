pub mod auth;
pub mod categories;
pub mod comments;
pub mod cookie;
pub mod error;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod reactions;
pub mod sessions;
pub mod state;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tracing::error;

use crate::error::ApiError;
use crate::middleware::{require_auth, resolve_identity};
use crate::state::AppState;

/// Every route runs behind the identity gate; the protected group is further
/// wrapped by `require_auth` and redirects anonymous callers to `/login`.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/posts/create", post(posts::create_post))
        .route("/posts/mine", get(posts::my_posts))
        .route("/posts/liked", get(posts::liked_posts))
        .route("/posts/{post_id}/comments", post(comments::create_comment))
        .route("/posts/{post_id}/react", post(reactions::react_post))
        .route("/comments/{comment_id}/react", post(reactions::react_comment))
        .route_layer(from_fn(require_auth));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/", get(posts::list_posts))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{category_id}/posts", get(categories::category_posts))
        .merge(protected_routes)
        .layer(from_fn_with_state(state.clone(), resolve_identity))
        .with_state(state)
}

/// Run store and hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("blocking task failed".into())
    })?
}
