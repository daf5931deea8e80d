/// Authentication workflow
///
/// Per-user session state lives in the stored refresh-token hash:
/// - absent: logged out
/// - present: logged in with exactly one valid refresh token
///
/// Signup, signin and refresh all issue a new pair and overwrite the stored
/// hash, so any earlier refresh token stops working immediately. Logout clears
/// the hash.

use std::sync::Arc;

use crate::auth::jwt::{TokenIssuer, TokenPair};
use crate::auth::password::PasswordHasher;
use crate::error::AppError;
use crate::store::{User, UserStore};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    /// Checked against on unknown emails so both signin failures cost one bcrypt verify
    dummy_hash: Arc<String>,
}

impl AuthService {
    /// # Errors
    /// Returns error if the hasher rejects its cost factor
    pub fn new(
        store: Arc<dyn UserStore>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let dummy_hash = Arc::new(hasher.hash(&uuid::Uuid::new_v4().to_string())?);

        Ok(Self {
            store,
            issuer,
            hasher,
            dummy_hash,
        })
    }

    /// Register a new user and log them in.
    ///
    /// # Errors
    /// - `DuplicateEmail` if the store already holds `email`
    /// - any store, hashing or signing failure, unchanged
    #[tracing::instrument(name = "sign_up", skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let hasher = self.hasher;
        let plaintext = password.to_string();
        let password_hash = run_blocking(move || hasher.hash(&plaintext)).await?;

        let user = self.store.create_user(email, &password_hash).await?;
        let tokens = self.rotate(&user).await?;

        tracing::info!(user_id = user.id, "User signed up");
        Ok(tokens)
    }

    /// Log in with email and password.
    ///
    /// Unknown email and wrong password fail with the same `AccessDenied`.
    #[tracing::instrument(name = "sign_in", skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.store.find_by_email(email).await?;
        let stored = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.as_ref().clone(),
        };

        let hasher = self.hasher;
        let plaintext = password.to_string();
        let matches = run_blocking(move || hasher.verify(&plaintext, &stored)).await?;

        let user = match user {
            Some(user) if matches => user,
            Some(user) => {
                tracing::debug!(user_id = user.id, "Sign in with wrong password");
                return Err(AppError::access_denied());
            }
            None => {
                tracing::debug!("Sign in for unknown email");
                return Err(AppError::access_denied());
            }
        };

        let tokens = self.rotate(&user).await?;

        tracing::info!(user_id = user.id, "User signed in");
        Ok(tokens)
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// The caller has already checked the token's signature and expiry; this
    /// only compares it with the stored hash.
    #[tracing::instrument(name = "refresh", skip(self, refresh_token))]
    pub async fn refresh(&self, user_id: i64, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(AppError::access_denied)?;

        let stored = match user.refresh_token_hash.clone() {
            Some(hash) => hash,
            None => {
                tracing::debug!(user_id, "Refresh while logged out");
                return Err(AppError::access_denied());
            }
        };

        let hasher = self.hasher;
        let presented = refresh_token.to_string();
        let matches = run_blocking(move || hasher.verify_refresh_token(&presented, &stored)).await?;
        if !matches {
            tracing::warn!(user_id, "Stale or foreign refresh token presented");
            return Err(AppError::access_denied());
        }

        let tokens = self.rotate(&user).await?;

        tracing::info!(user_id, "Tokens refreshed");
        Ok(tokens)
    }

    /// End the user's session. Logging out twice is a no-op.
    #[tracing::instrument(name = "logout", skip(self))]
    pub async fn logout(&self, user_id: i64) -> Result<(), AppError> {
        let cleared = self.store.clear_refresh_hash(user_id).await?;

        if cleared {
            tracing::info!(user_id, "User logged out");
        } else {
            tracing::debug!(user_id, "Logout without an active session");
        }
        Ok(())
    }

    /// Issue a fresh pair and make its refresh token the only valid one.
    async fn rotate(&self, user: &User) -> Result<TokenPair, AppError> {
        let tokens = self.issuer.issue(user.id, &user.email)?;

        let hasher = self.hasher;
        let refresh_token = tokens.refresh_token.clone();
        let refresh_hash = run_blocking(move || hasher.hash_refresh_token(&refresh_token)).await?;

        self.store.update_refresh_hash(user.id, &refresh_hash).await?;
        Ok(tokens)
    }
}

/// bcrypt is CPU bound; keep it off the async workers.
async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}
