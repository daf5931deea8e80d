/// JWT Claims structure
///
/// Payload shared by access and refresh tokens: the user id, the email and
/// the standard `exp`/`iat`/`jti` claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (numeric user id)
    pub sub: i64,
    /// User email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Create claims for `user_id` valid for `expiry_seconds` from `now`
    pub fn new(user_id: i64, email: String, now: i64, expiry_seconds: i64) -> Self {
        Self {
            sub: user_id,
            email,
            exp: now + expiry_seconds,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.sub
    }

    /// A token stays valid up to and including its `exp` second.
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(7, "test@example.com".to_string(), 1_000, 900);

        assert_eq!(claims.user_id(), 7);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_900);
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims::new(1, "a@b.com".to_string(), 0, 900);

        assert!(!claims.is_expired(899));
        assert!(!claims.is_expired(900));
        assert!(claims.is_expired(901));
    }

    #[test]
    fn test_each_claim_set_gets_a_fresh_id() {
        let a = Claims::new(1, "a@b.com".to_string(), 0, 900);
        let b = Claims::new(1, "a@b.com".to_string(), 0, 900);
        assert_ne!(a.jti, b.jti);
    }
}
