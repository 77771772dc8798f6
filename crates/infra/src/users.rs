//! Credential records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soundvault_auth::Permission;
use soundvault_core::UserId;

use crate::Page;
use crate::error::StoreError;

/// A stored user account. `email` is unique and kept lowercased by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        permissions: Vec<Permission>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            permissions,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Newest first.
    async fn find_all(&self, skip: usize, limit: usize) -> Result<Page<UserRecord>, StoreError>;

    /// Insert a new record. Fails with `Conflict` when the id or email is taken.
    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    /// Replace an existing record and bump `updated_at`.
    async fn update(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &UserId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn find_all(&self, skip: usize, limit: usize) -> Result<Page<UserRecord>, StoreError> {
        (**self).find_all(skip, limit).await
    }

    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        (**self).create(user).await
    }

    async fn update(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        (**self).update(user).await
    }

    async fn delete(&self, id: &UserId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }
}

/// In-memory user store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(map: &HashMap<UserId, UserRecord>, email: &str, except: &UserId) -> bool {
        map.values().any(|u| u.email == email && &u.id != except)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn find_all(&self, skip: usize, limit: usize) -> Result<Page<UserRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut all: Vec<UserRecord> = map.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(Page::slice(all, skip, limit))
    }

    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if map.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user id {}", user.id)));
        }
        if Self::email_taken(&map, &user.email, &user.id) {
            return Err(StoreError::Conflict(format!("email {}", user.email)));
        }
        map.insert(user.id.clone(), user.clone());
        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }

    async fn update(&self, mut user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if !map.contains_key(&user.id) {
            return Err(StoreError::NotFound("user"));
        }
        if Self::email_taken(&map, &user.email, &user.id) {
            return Err(StoreError::Conflict(format!("email {}", user.email)));
        }
        user.updated_at = Utc::now();
        map.insert(user.id.clone(), user.clone());
        tracing::info!(user_id = %user.id, "updated user");
        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        Ok(map.remove(id).is_some())
    }
}
