use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// One-way password digests. Swappable so tests can avoid the cost of Argon2.
pub trait PasswordScheme: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// False on mismatch and on a digest that cannot be parsed.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Argon2id with default parameters and a per-password random salt.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Scheme;

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
