//! User Store
//!
//! Repository for local users. Email, provider identity and nickname are unique.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::{SocialType, User};

/// User store interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError>;

    /// Look up by provider-side subject.
    async fn find_by_provider_id(
        &self,
        social_type: SocialType,
        provider_id: &str,
    ) -> Result<Option<User>, StorageError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, StorageError>;

    /// Insert a new user. A duplicate unique key yields `StorageError::Conflict`.
    async fn create(&self, user: User) -> Result<User, StorageError>;

    /// Overwrite an existing user.
    async fn update(&self, user: User) -> Result<User, StorageError>;
}

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    /// Create new in-memory user store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, StorageError> {
        self.users.lock().map_err(|_| StorageError::Unavailable {
            message: "user store lock poisoned".to_string(),
        })
    }

    fn find_where<F>(&self, predicate: F) -> Result<Option<User>, StorageError>
    where
        F: Fn(&User) -> bool,
    {
        Ok(self.lock()?.values().find(|u| predicate(u)).cloned())
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn conflict_with(existing: &User, candidate: &User) -> Option<&'static str> {
    if existing.id == candidate.id {
        return None;
    }
    if existing.email == candidate.email {
        Some("email")
    } else if existing.social_type == candidate.social_type
        && existing.provider_id == candidate.provider_id
    {
        Some("provider_id")
    } else if existing.nickname == candidate.nickname {
        Some("nickname")
    } else {
        None
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_provider_id(
        &self,
        social_type: SocialType,
        provider_id: &str,
    ) -> Result<Option<User>, StorageError> {
        self.find_where(|u| u.social_type == social_type && u.provider_id == provider_id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        self.find_where(|u| u.email == email)
    }

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, StorageError> {
        self.find_where(|u| u.nickname == nickname)
    }

    async fn create(&self, user: User) -> Result<User, StorageError> {
        let mut users = self.lock()?;
        if users.contains_key(&user.id) {
            return Err(StorageError::Conflict {
                message: format!("user {} already exists", user.id),
            });
        }
        if let Some(field) = users.values().find_map(|u| conflict_with(u, &user)) {
            return Err(StorageError::Conflict {
                message: format!("duplicate user {}", field),
            });
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, StorageError> {
        let mut users = self.lock()?;
        if !users.contains_key(&user.id) {
            return Err(StorageError::NotFound {
                id: user.id.to_string(),
            });
        }
        if let Some(field) = users.values().find_map(|u| conflict_with(u, &user)) {
            return Err(StorageError::Conflict {
                message: format!("duplicate user {}", field),
            });
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderClaims;

    fn user(provider_id: &str, email: &str, nickname: &str) -> User {
        User::from_claims(
            &ProviderClaims {
                provider_id: provider_id.to_string(),
                email: email.to_string(),
                name: None,
                nickname: Some(nickname.to_string()),
                profile_image: None,
            },
            SocialType::Kakao,
        )
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = InMemoryUserStore::new();
        let created = store.create(user("1", "a@example.com", "a")).await.unwrap();

        assert_eq!(store.find_by_id(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(
            store.find_by_provider_id(SocialType::Kakao, "1").await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(store.find_by_email("a@example.com").await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_nickname("a").await.unwrap(), Some(created));
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_keys() {
        let store = InMemoryUserStore::new();
        store.create(user("1", "a@example.com", "a")).await.unwrap();

        for duplicate in [
            user("2", "a@example.com", "b"),
            user("1", "c@example.com", "c"),
            user("3", "d@example.com", "a"),
        ] {
            assert!(matches!(
                store.create(duplicate).await,
                Err(StorageError::Conflict { .. })
            ));
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update() {
        let store = InMemoryUserStore::new();
        let mut first = store.create(user("1", "a@example.com", "a")).await.unwrap();
        store.create(user("2", "b@example.com", "b")).await.unwrap();

        first.nickname = "b".to_string();
        assert!(matches!(
            store.update(first.clone()).await,
            Err(StorageError::Conflict { .. })
        ));

        first.nickname = "renamed".to_string();
        store.update(first.clone()).await.unwrap();
        assert_eq!(store.find_by_nickname("renamed").await.unwrap(), Some(first));

        let unknown = user("9", "z@example.com", "z");
        assert!(matches!(
            store.update(unknown).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
