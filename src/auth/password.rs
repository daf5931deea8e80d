/// Password and Refresh Token Hashing
///
/// Salted one-way hashing with bcrypt. The same hasher protects login
/// passwords and the single stored refresh token per user.

use bcrypt::{hash, verify};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// bcrypt work factor used in production
pub const DEFAULT_HASH_COST: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext value with a fresh random salt
    ///
    /// # Errors
    /// Returns error if bcrypt rejects the cost factor
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        hash(plaintext, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Check a plaintext value against a stored bcrypt hash
    ///
    /// A mismatch is `Ok(false)`, never an error.
    ///
    /// # Errors
    /// Returns `MalformedHash` if the stored hash cannot be parsed
    pub fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, AppError> {
        verify(plaintext, hashed).map_err(|e| AppError::MalformedHash(e.to_string()))
    }

    /// Hash a refresh token for storage.
    ///
    /// bcrypt only reads the first 72 bytes of its input, and JWTs for the
    /// same user share a long common prefix, so the token is first reduced to
    /// its SHA-256 digest.
    pub fn hash_refresh_token(&self, token: &str) -> Result<String, AppError> {
        self.hash(&token_digest(token))
    }

    pub fn verify_refresh_token(&self, token: &str, hashed: &str) -> Result<bool, AppError> {
        self.verify(&token_digest(token), hashed)
    }
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
