//! Token Store
//!
//! Persistence for token records. All mutations that must be atomic together
//! (revoking a user's previous record while saving a new one, rotating a record
//! on refresh) happen inside one critical section.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::TokenRecord;

/// Token store interface.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new active record, revoking the user's previous active record.
    async fn save(&self, record: TokenRecord) -> Result<(), StorageError>;

    /// Look up a record by local access token.
    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError>;

    /// Look up a record by local refresh token.
    async fn find_by_refresh_token(&self, token: &str)
        -> Result<Option<TokenRecord>, StorageError>;

    /// The user's current non-revoked record, if any.
    async fn find_active_by_user(&self, user_id: Uuid)
        -> Result<Option<TokenRecord>, StorageError>;

    /// Revoke a record. Returns `false` if it was already revoked.
    async fn revoke(&self, id: Uuid) -> Result<bool, StorageError>;

    /// Revoke `old_id` and insert `new` atomically, only if `old_id` is not
    /// yet revoked. A lost race yields `StorageError::Conflict`.
    async fn replace(&self, old_id: Uuid, new: TokenRecord) -> Result<(), StorageError>;

    /// Delete records that are revoked or whose refresh token has expired.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

#[derive(Default)]
struct Records {
    records: HashMap<Uuid, TokenRecord>,
    by_access: HashMap<String, Uuid>,
    by_refresh: HashMap<String, Uuid>,
}

impl Records {
    fn get_by(&self, index: &HashMap<String, Uuid>, token: &str) -> Option<TokenRecord> {
        index.get(token).and_then(|id| self.records.get(id)).cloned()
    }

    fn check_unique(&self, record: &TokenRecord) -> Result<(), StorageError> {
        if self.records.contains_key(&record.id)
            || self.by_access.contains_key(&record.access_token)
            || self.by_refresh.contains_key(&record.refresh_token)
        {
            return Err(StorageError::Conflict {
                message: format!("token record {} collides with an existing record", record.id),
            });
        }
        Ok(())
    }

    fn revoke_active_for_user(&mut self, user_id: Uuid) {
        for record in self.records.values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
            }
        }
    }

    fn insert(&mut self, record: TokenRecord) {
        self.by_access.insert(record.access_token.clone(), record.id);
        self.by_refresh.insert(record.refresh_token.clone(), record.id);
        self.records.insert(record.id, record);
    }
}

/// In-memory token store. One mutex guards the records and both token indexes.
pub struct InMemoryTokenStore {
    inner: Mutex<Records>,
}

impl InMemoryTokenStore {
    /// Create new in-memory token store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Records::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Unavailable {
            message: "token store lock poisoned".to_string(),
        })
    }

    /// Number of stored records, revoked included.
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, record: TokenRecord) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.check_unique(&record)?;
        inner.revoke_active_for_user(record.user_id);
        inner.insert(record);
        Ok(())
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.get_by(&inner.by_access, token))
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<TokenRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.get_by(&inner.by_refresh, token))
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TokenRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .values()
            .find(|r| r.user_id == user_id && !r.revoked)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })?;

        if record.revoked {
            return Ok(false);
        }
        record.revoked = true;
        Ok(true)
    }

    async fn replace(&self, old_id: Uuid, new: TokenRecord) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        match inner.records.get(&old_id) {
            None => {
                return Err(StorageError::NotFound {
                    id: old_id.to_string(),
                })
            }
            Some(old) if old.revoked => {
                return Err(StorageError::Conflict {
                    message: format!("token record {} already revoked", old_id),
                })
            }
            Some(_) => {}
        }
        inner.check_unique(&new)?;

        if let Some(old) = inner.records.get_mut(&old_id) {
            old.revoked = true;
        }
        inner.revoke_active_for_user(new.user_id);
        inner.insert(new);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;
        let doomed: Vec<Uuid> = inner
            .records
            .values()
            .filter(|r| r.revoked || r.is_refresh_expired(now))
            .map(|r| r.id)
            .collect();

        for id in &doomed {
            if let Some(record) = inner.records.remove(id) {
                inner.by_access.remove(&record.access_token);
                inner.by_refresh.remove(&record.refresh_token);
            }
        }

        Ok(doomed.len() as u64)
    }
}

/// Store operation, for mock failure injection and history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Save,
    Find,
    Revoke,
    Replace,
    Purge,
}

/// Mock token store for testing. Delegates to an in-memory store and records
/// every call; selected operations can be made to fail.
#[derive(Default)]
pub struct MockTokenStore {
    inner: InMemoryTokenStore,
    failing: Mutex<HashSet<StoreOperation>>,
    history: Mutex<Vec<StoreOperation>>,
}

impl MockTokenStore {
    /// Create new mock token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an operation fail with `StorageError::Unavailable`.
    pub fn fail_on(&self, operation: StoreOperation) -> &Self {
        self.failing.lock().unwrap().insert(operation);
        self
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) -> &Self {
        self.failing.lock().unwrap().clear();
        self
    }

    /// Get call history.
    pub fn get_history(&self) -> Vec<StoreOperation> {
        self.history.lock().unwrap().clone()
    }

    /// Count calls of one operation.
    pub fn count(&self, operation: StoreOperation) -> usize {
        self.get_history().iter().filter(|op| **op == operation).count()
    }

    fn record(&self, operation: StoreOperation) -> Result<(), StorageError> {
        self.history.lock().unwrap().push(operation);
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(StorageError::Unavailable {
                message: format!("injected {:?} failure", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn save(&self, record: TokenRecord) -> Result<(), StorageError> {
        self.record(StoreOperation::Save)?;
        self.inner.save(record).await
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        self.record(StoreOperation::Find)?;
        self.inner.find_by_access_token(token).await
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<TokenRecord>, StorageError> {
        self.record(StoreOperation::Find)?;
        self.inner.find_by_refresh_token(token).await
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TokenRecord>, StorageError> {
        self.record(StoreOperation::Find)?;
        self.inner.find_active_by_user(user_id).await
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, StorageError> {
        self.record(StoreOperation::Revoke)?;
        self.inner.revoke(id).await
    }

    async fn replace(&self, old_id: Uuid, new: TokenRecord) -> Result<(), StorageError> {
        self.record(StoreOperation::Replace)?;
        self.inner.replace(old_id, new).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        self.record(StoreOperation::Purge)?;
        self.inner.purge_expired(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssuedTokens, ProviderCredential};
    use chrono::Duration;
    use std::sync::Arc;

    fn record(user_id: Uuid, access: &str, refresh: &str) -> TokenRecord {
        let now = Utc::now();
        TokenRecord::new(
            user_id,
            IssuedTokens {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_at: now + Duration::hours(6),
                refresh_expires_at: now + Duration::days(14),
            },
            ProviderCredential {
                access_token: format!("p-{}", access),
                refresh_token: format!("p-{}", refresh),
                expires_at: now + Duration::hours(6),
                refresh_expires_at: None,
                scopes: Vec::new(),
            },
            now,
        )
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = InMemoryTokenStore::new();
        let user = Uuid::new_v4();
        store.save(record(user, "at1", "rt1")).await.unwrap();

        let by_access = store.find_by_access_token("at1").await.unwrap().unwrap();
        let by_refresh = store.find_by_refresh_token("rt1").await.unwrap().unwrap();
        assert_eq!(by_access.id, by_refresh.id);
        assert!(store.find_by_access_token("rt1").await.unwrap().is_none());
        assert_eq!(
            store.find_active_by_user(user).await.unwrap().unwrap().id,
            by_access.id
        );
    }

    #[tokio::test]
    async fn test_save_revokes_previous_record_for_user() {
        let store = InMemoryTokenStore::new();
        let user = Uuid::new_v4();
        store.save(record(user, "at1", "rt1")).await.unwrap();
        store.save(record(user, "at2", "rt2")).await.unwrap();

        assert!(store.find_by_access_token("at1").await.unwrap().unwrap().revoked);
        let active = store.find_active_by_user(user).await.unwrap().unwrap();
        assert_eq!(active.access_token, "at2");
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_tokens() {
        let store = InMemoryTokenStore::new();
        store.save(record(Uuid::new_v4(), "at1", "rt1")).await.unwrap();

        let result = store.save(record(Uuid::new_v4(), "at1", "rt9")).await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = InMemoryTokenStore::new();
        let rec = record(Uuid::new_v4(), "at1", "rt1");
        let id = rec.id;
        store.save(rec).await.unwrap();

        assert!(store.revoke(id).await.unwrap());
        assert!(!store.revoke(id).await.unwrap());
        assert!(matches!(
            store.revoke(Uuid::new_v4()).await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_replace_is_compare_and_swap() {
        let store = InMemoryTokenStore::new();
        let user = Uuid::new_v4();
        let old = record(user, "at1", "rt1");
        let old_id = old.id;
        store.save(old).await.unwrap();

        store.replace(old_id, record(user, "at2", "rt2")).await.unwrap();
        assert!(store.find_by_refresh_token("rt1").await.unwrap().unwrap().revoked);

        let second = store.replace(old_id, record(user, "at3", "rt3")).await;
        assert!(matches!(second, Err(StorageError::Conflict { .. })));
        assert!(store.find_by_access_token("at3").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replace_single_winner() {
        let store = Arc::new(InMemoryTokenStore::new());
        let user = Uuid::new_v4();
        let old = record(user, "at1", "rt1");
        let old_id = old.id;
        store.save(old).await.unwrap();

        let handles = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .replace(old_id, record(user, &format!("at-{}", i), &format!("rt-{}", i)))
                    .await
            })
        });

        let results = futures::future::join_all(handles).await;
        let wins = results.into_iter().filter(|r| matches!(r, Ok(Ok(())))).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryTokenStore::new();
        let user = Uuid::new_v4();
        store.save(record(user, "at1", "rt1")).await.unwrap();
        store.save(record(user, "at2", "rt2")).await.unwrap();

        let mut stale = record(Uuid::new_v4(), "at3", "rt3");
        stale.refresh_expires_at = Utc::now() - Duration::seconds(1);
        store.save(stale).await.unwrap();

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.find_by_refresh_token("rt1").await.unwrap().is_none());
        assert!(store.find_by_refresh_token("rt3").await.unwrap().is_none());
        assert!(store.find_by_refresh_token("rt2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mock_store_failure_injection() {
        let store = MockTokenStore::new();
        let rec = record(Uuid::new_v4(), "at1", "rt1");
        let id = rec.id;
        store.save(rec).await.unwrap();

        store.fail_on(StoreOperation::Revoke);
        assert!(matches!(
            store.revoke(id).await,
            Err(StorageError::Unavailable { .. })
        ));

        store.clear_failures();
        assert!(store.revoke(id).await.unwrap());
        assert_eq!(store.count(StoreOperation::Revoke), 2);
        assert_eq!(store.get_history()[0], StoreOperation::Save);
    }
}
