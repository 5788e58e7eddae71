use std::time::Duration;

use axum::http::{HeaderMap, header::SET_COOKIE};
use axum_extra::headers::{Cookie, HeaderMapExt};

pub const SESSION_COOKIE: &str = "session_id";

/// Attributes for the session cookie. The value is always the session token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub max_age: Duration,
    pub secure: bool,
}

impl SessionCookie {
    pub fn issue(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; Max-Age={}{}",
            self.max_age.as_secs(),
            self.suffix()
        )
    }

    /// Empty value, already expired.
    pub fn clear(&self) -> String {
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0{}", self.suffix())
    }

    fn suffix(&self) -> &'static str {
        if self.secure {
            "; Secure; SameSite=Strict"
        } else {
            "; SameSite=Strict"
        }
    }
}

/// The non-empty session token carried by the request, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Cookie>()?
        .get(SESSION_COOKIE)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Whether a response already writes the session cookie.
pub fn sets_session_cookie(headers: &HeaderMap) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}
