/// JWT Token Generation and Validation
///
/// Mints access/refresh token pairs and validates presented tokens. Each kind
/// has its own HMAC secret and lifetime; expiry is checked against an injected
/// [`Clock`] rather than the library's wall-clock check.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::claims::Claims;
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Access and refresh token returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: i64,
}

impl SigningKey {
    fn from_secret(secret: &str, ttl: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

pub struct TokenIssuer {
    access: SigningKey,
    refresh: SigningKey,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &JwtSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: SigningKey::from_secret(&config.access_secret, config.access_token_expiry),
            refresh: SigningKey::from_secret(&config.refresh_secret, config.refresh_token_expiry),
            clock,
        }
    }

    /// Mint a new access/refresh pair for a user.
    ///
    /// Both tokens share the same issue instant. If either signature fails the
    /// whole pair is discarded.
    ///
    /// The two are signed one after the other: HS256 signing is far cheaper
    /// than a spawned task, and neither token depends on the other.
    ///
    /// # Errors
    /// Returns error if token signing fails
    pub fn issue(&self, user_id: i64, email: &str) -> Result<TokenPair, AppError> {
        let now = self.clock.now();
        let access_token = self.sign(TokenKind::Access, user_id, email, now)?;
        let refresh_token = self.sign(TokenKind::Refresh, user_id, email, now)?;

        tracing::debug!(user_id = user_id, issued_at = now, "Token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate a token of the given kind and return its claims
    ///
    /// # Errors
    /// - `TokenInvalid` if the token is malformed, tampered with, or signed
    ///   with the other kind's secret
    /// - `TokenExpired` if the injected clock is past `exp`
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.key(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(kind = kind.as_str(), "JWT validation error: {}", e);
                AuthError::TokenInvalid
            })?;

        if claims.is_expired(self.clock.now()) {
            tracing::info!(kind = kind.as_str(), user_id = claims.sub, "Token expired");
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign(&self, kind: TokenKind, user_id: i64, email: &str, now: i64) -> Result<String, AppError> {
        let key = self.key(kind);
        let claims = Claims::new(user_id, email.to_string(), now, key.ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &key.encoding).map_err(|e| {
            AppError::Internal(format!("{} token generation failed: {}", kind.as_str(), e))
        })
    }
}
