use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use forum_db::{Database, DbError};
use rand_core::{OsRng, RngCore};
use tracing::{debug, info, warn};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("session expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Issues, checks and revokes login sessions. A user holds at most one
/// session; issuing a new one revokes the previous.
#[derive(Clone)]
pub struct SessionManager {
    db: Arc<Database>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Start a session for `user_id` and return its token.
    pub fn create(&self, user_id: i64) -> Result<String, SessionError> {
        let token = generate_token();
        let expires_at = expiry_from(Utc::now().timestamp(), self.ttl);

        self.db.replace_session(&token, user_id, expires_at)?;
        info!(user_id, "Session created");
        Ok(token)
    }

    /// Resolve a token to its user id. An expired session is deleted on sight.
    pub fn validate(&self, token: &str) -> Result<i64, SessionError> {
        let session = self.db.get_session(token)?.ok_or(SessionError::NotFound)?;

        let now = Utc::now().timestamp();
        if session.expires_at <= now {
            self.db.delete_expired_session(token, now)?;
            debug!(user_id = session.user_id, "Removed expired session on lookup");
            return Err(SessionError::Expired);
        }

        Ok(session.user_id)
    }

    /// Revoke a session. Unknown tokens are not an error.
    pub fn delete(&self, token: &str) -> Result<(), SessionError> {
        if self.db.delete_session(token)? {
            debug!("Session deleted");
        }
        Ok(())
    }

    /// Remove every session expired as of now; returns how many went.
    pub fn sweep_expired(&self) -> Result<usize, SessionError> {
        Ok(self.db.delete_expired_sessions(Utc::now().timestamp())?)
    }
}

/// Expiry timestamp for a session issued at `now`. Saturates instead of
/// overflowing for absurdly long lifetimes.
fn expiry_from(now: i64, ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .unwrap_or(i64::MAX)
}

/// 256 bits from the OS RNG, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Background task that prunes expired sessions. A failed pass is logged and
/// the loop carries on.
pub async fn run_sweep_loop(sessions: SessionManager, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let manager = sessions.clone();
        match tokio::task::spawn_blocking(move || manager.sweep_expired()).await {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Sweep: removed {} expired sessions", count);
                }
            }
            Ok(Err(e)) => {
                warn!("Session sweep error: {}", e);
            }
            Err(e) => {
                warn!("Session sweep task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<Database>, SessionManager) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("forum.db")).unwrap());
        let manager = SessionManager::new(db.clone(), DEFAULT_SESSION_TTL);
        (dir, db, manager)
    }

    fn user(db: &Database, name: &str) -> i64 {
        db.create_user(name, &format!("{name}@example.com"), "digest").unwrap()
    }

    #[test]
    fn tokens_are_long_and_unique() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 256);
        for token in &tokens {
            // 32 bytes -> 43 base64url characters.
            assert_eq!(token.len(), 43);
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[test]
    fn create_then_validate() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");

        let token = sessions.create(alice).unwrap();
        assert_eq!(sessions.validate(&token).unwrap(), alice);

        let row = db.get_session(&token).unwrap().unwrap();
        let remaining = row.expires_at - Utc::now().timestamp();
        let ttl = DEFAULT_SESSION_TTL.as_secs() as i64;
        assert!(remaining > ttl - 5 && remaining <= ttl, "remaining {remaining}");
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        assert_eq!(expiry_from(1_000, Duration::from_secs(60)), 1_060);
        assert_eq!(expiry_from(1_000, Duration::from_secs(u64::MAX)), i64::MAX);
        assert_eq!(expiry_from(i64::MAX - 10, Duration::from_secs(3600)), i64::MAX);

        let (_dir, db, _) = setup();
        let alice = user(&db, "alice");
        let sessions = SessionManager::new(db.clone(), Duration::MAX);
        let token = sessions.create(alice).unwrap();
        assert_eq!(sessions.validate(&token).unwrap(), alice);
    }

    #[test]
    fn new_login_revokes_previous_session() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let first = sessions.create(alice).unwrap();
        let bobs = sessions.create(bob).unwrap();
        let second = sessions.create(alice).unwrap();

        assert_ne!(first, second);
        assert!(matches!(sessions.validate(&first), Err(SessionError::NotFound)));
        assert_eq!(sessions.validate(&second).unwrap(), alice);
        assert_eq!(sessions.validate(&bobs).unwrap(), bob);
    }

    #[test]
    fn unknown_token_is_not_found() {
        let (_dir, _db, sessions) = setup();
        assert!(matches!(sessions.validate("nope"), Err(SessionError::NotFound)));
    }

    #[test]
    fn expired_session_is_deleted_on_lookup() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        db.replace_session("stale", alice, Utc::now().timestamp() - 60).unwrap();

        assert!(matches!(sessions.validate("stale"), Err(SessionError::Expired)));
        assert!(db.get_session("stale").unwrap().is_none());
        assert!(matches!(sessions.validate("stale"), Err(SessionError::NotFound)));
    }

    #[test]
    fn session_expiring_exactly_now_is_expired() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        db.replace_session("edge", alice, Utc::now().timestamp()).unwrap();

        assert!(matches!(sessions.validate("edge"), Err(SessionError::Expired)));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        let token = sessions.create(alice).unwrap();

        sessions.delete(&token).unwrap();
        sessions.delete(&token).unwrap();
        sessions.delete("never-existed").unwrap();
        assert!(matches!(sessions.validate(&token), Err(SessionError::NotFound)));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let carol = user(&db, "carol");
        let now = Utc::now().timestamp();
        db.replace_session("old-a", alice, now - 10).unwrap();
        db.replace_session("old-b", bob, now - 3600).unwrap();
        let live = sessions.create(carol).unwrap();

        assert_eq!(sessions.sweep_expired().unwrap(), 2);
        assert_eq!(sessions.sweep_expired().unwrap(), 0);
        assert_eq!(sessions.validate(&live).unwrap(), carol);
    }

    #[test]
    fn deleting_user_drops_their_session() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        let token = sessions.create(alice).unwrap();

        db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [alice])?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(sessions.validate(&token), Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn sweep_loop_prunes_in_background() {
        let (_dir, db, sessions) = setup();
        let alice = user(&db, "alice");
        db.replace_session("stale", alice, Utc::now().timestamp() - 1).unwrap();

        let handle = tokio::spawn(run_sweep_loop(sessions, Duration::from_millis(20)));

        let mut gone = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if db.get_session("stale").unwrap().is_none() {
                gone = true;
                break;
            }
        }
        handle.abort();
        assert!(gone, "sweep loop never removed the expired session");
    }
}
