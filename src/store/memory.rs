use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, DatabaseError};
use crate::store::{User, UserStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, User>,
}

/// Process-local store with the same contract as the `users` table:
/// sequential ids starting at 1 and a unique email constraint.
#[derive(Default)]
pub struct InMemoryUserStore {
    tables: Mutex<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.users.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Database(DatabaseError::ConnectionPool("store lock poisoned".to_string())))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == email) {
            return Err(AppError::Database(DatabaseError::DuplicateEmail));
        }

        tables.next_id += 1;
        let user = User {
            id: tables.next_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token_hash: None,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn update_refresh_hash(&self, id: i64, refresh_token_hash: &str) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound(format!("user {}", id))))?;
        user.refresh_token_hash = Some(refresh_token_hash.to_string());
        Ok(())
    }

    async fn clear_refresh_hash(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&id) {
            Some(user) if user.refresh_token_hash.is_some() => {
                user.refresh_token_hash = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryUserStore::new();
        let first = store.create_user("a@b.com", "hash").await.unwrap();
        let second = store.create_user("c@d.com", "hash").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.is_logged_in());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create_user("a@b.com", "hash").await.unwrap();

        let err = store.create_user("a@b.com", "other").await.unwrap_err();
        assert!(err.is_duplicate_email());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_email_and_id() {
        let store = InMemoryUserStore::new();
        let user = store.create_user("a@b.com", "hash").await.unwrap();

        let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_email.id, by_id.id);

        assert!(store.find_by_email("nope@x.com").await.unwrap().is_none());
        assert!(store.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_hash_update_and_conditional_clear() {
        let store = InMemoryUserStore::new();
        let user = store.create_user("a@b.com", "hash").await.unwrap();

        store.update_refresh_hash(user.id, "rt-hash").await.unwrap();
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash.as_deref(), Some("rt-hash"));

        assert!(store.clear_refresh_hash(user.id).await.unwrap());
        assert!(!store.clear_refresh_hash(user.id).await.unwrap());
        assert!(!store.clear_refresh_hash(99).await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token_hash.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_user_fails() {
        let store = InMemoryUserStore::new();
        let err = store.update_refresh_hash(7, "rt-hash").await.unwrap_err();
        assert!(matches!(err, AppError::Database(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(InMemoryUserStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tables.lock().unwrap();
            panic!("poison the store lock");
        })
        .join();

        assert!(matches!(
            store.len(),
            Err(AppError::Database(DatabaseError::ConnectionPool(_)))
        ));
        assert!(store.find_by_id(1).await.is_err());
    }
}
