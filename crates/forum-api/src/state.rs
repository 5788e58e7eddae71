use std::sync::Arc;
use std::time::Duration;

use forum_db::Database;

use crate::cookie::SessionCookie;
use crate::password::{PasswordError, PasswordScheme};
use crate::sessions::{SessionManager, generate_token};

pub type AppState = Arc<AppStateInner>;

/// Shared by every handler. The store handle is passed in here and nowhere
/// else; components receive it from this struct.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: SessionManager,
    pub passwords: Arc<dyn PasswordScheme>,
    /// Digest of a random secret, verified against when a login names an
    /// unknown email so both outcomes cost one hash verification.
    pub dummy_digest: String,
    pub cookie: SessionCookie,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        passwords: Arc<dyn PasswordScheme>,
        session_ttl: Duration,
        secure_cookies: bool,
    ) -> Result<AppState, PasswordError> {
        let dummy_digest = passwords.hash(&generate_token())?;

        Ok(Arc::new(Self {
            sessions: SessionManager::new(db.clone(), session_ttl),
            cookie: SessionCookie {
                max_age: session_ttl,
                secure: secure_cookies,
            },
            db,
            passwords,
            dummy_digest,
        }))
    }
}
