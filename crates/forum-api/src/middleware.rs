use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use forum_types::models::User;
use tracing::debug;

use crate::blocking;
use crate::cookie::{session_token, sets_session_cookie};
use crate::error::ApiError;
use crate::sessions::SessionError;
use crate::state::{AppState, AppStateInner};

pub const LOGIN_PATH: &str = "/login";

/// Identity resolved for the current request; `None` is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

/// Resolve the session cookie to a user. A stale or unknown cookie never
/// fails the request: it is treated as anonymous and cleared on the way out.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(req.headers()) else {
        req.extensions_mut().insert(CurrentUser(None));
        return Ok(next.run(req).await);
    };

    let lookup = state.clone();
    let user = blocking(move || identify(&lookup, &token)).await?;

    if let Some(user) = user {
        req.extensions_mut().insert(CurrentUser(Some(user)));
        return Ok(next.run(req).await);
    }

    req.extensions_mut().insert(CurrentUser(None));
    let mut response = next.run(req).await;

    // A handler that just logged the caller in owns the cookie.
    if !sets_session_cookie(response.headers()) {
        if let Ok(value) = HeaderValue::try_from(state.cookie.clear()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    Ok(response)
}

fn identify(state: &AppStateInner, token: &str) -> Result<Option<User>, ApiError> {
    let user_id = match state.sessions.validate(token) {
        Ok(user_id) => user_id,
        Err(SessionError::NotFound) => {
            debug!("Unknown session cookie, continuing anonymous");
            return Ok(None);
        }
        Err(SessionError::Expired) => {
            debug!("Expired session cookie, continuing anonymous");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let user = state.db.get_user_by_id(user_id)?;
    if user.is_none() {
        debug!(user_id, "Session owner no longer exists");
    }
    Ok(user.map(User::from))
}

/// Gate for routes that need a signed-in user. Relies on `resolve_identity`
/// having run; the resolved `User` is handed to the handler as an extension.
pub async fn require_auth(mut req: Request, next: Next) -> Response {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => Redirect::to(LOGIN_PATH).into_response(),
    }
}
