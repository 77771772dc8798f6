//! Password hashing and verification (Argon2id, PHC strings).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AuthError;

/// One-way, salted password hasher.
///
/// Every call to [`hash_password`](Self::hash_password) draws a fresh salt, so
/// the same plaintext yields different stored hashes; the salt and parameters
/// travel inside the PHC string so verification needs nothing else.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?;
        Ok(hash.to_string())
    }

    /// Check a plaintext against a stored PHC hash.
    ///
    /// The digest comparison is constant-time. A stored value that is not a
    /// parseable PHC string simply fails verification.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
