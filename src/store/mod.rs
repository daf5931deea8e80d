/// User record persistence
///
/// The auth workflow talks to storage only through [`UserStore`]. The
/// PostgreSQL implementation backs the server; the in-memory one backs tests
/// and local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// User record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Hash of the one refresh token currently allowed for this user.
    /// `None` means the user is logged out.
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
}

impl User {
    pub fn is_logged_in(&self) -> bool {
        self.refresh_token_hash.is_some()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A taken email yields `DatabaseError::DuplicateEmail`.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Overwrite the stored refresh-token hash (last writer wins)
    async fn update_refresh_hash(&self, id: i64, refresh_token_hash: &str) -> Result<(), AppError>;

    /// Clear the refresh-token hash if one is set for `id`.
    ///
    /// Returns whether a hash was actually cleared.
    async fn clear_refresh_hash(&self, id: i64) -> Result<bool, AppError>;
}
