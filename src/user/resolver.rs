//! User Resolver
//!
//! Maps provider identity claims to a local user, creating one on first login.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, StorageError, UserError};
use crate::types::{ProviderClaims, Role, SocialType, User};
use crate::user::store::UserStore;

/// Maximum nickname length, in characters.
pub const MAX_NICKNAME_LEN: usize = 50;

/// Resolves and maintains local users.
pub struct UserResolver {
    store: Arc<dyn UserStore>,
    social_type: SocialType,
}

impl UserResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            social_type: SocialType::Kakao,
        }
    }

    /// Find or create the user behind a set of verified claims.
    ///
    /// Concurrent first logins for the same identity yield one user: a
    /// unique-key conflict on create is retried as a lookup. A nickname taken
    /// between the check and the insert by another identity falls back once
    /// to the `_<provider_id>` suffix.
    pub async fn resolve(&self, claims: &ProviderClaims) -> Result<User, AuthError> {
        if let Some(user) = self.lookup(claims).await? {
            return Ok(user);
        }

        let mut user = User::from_claims(claims, self.social_type);
        let wanted = user.nickname.clone();
        user.nickname = self.available_nickname(&wanted, &claims.provider_id).await?;
        let suffixed = user.nickname != truncate(wanted.trim(), MAX_NICKNAME_LEN);

        let message = match self.store.create(user).await {
            Ok(user) => return Ok(created(user)),
            Err(StorageError::Conflict { message }) => message,
            Err(e) => return Err(e.into()),
        };
        if let Some(user) = self.lookup(claims).await? {
            debug!(conflict = %message, "user created concurrently, resolved by lookup");
            return Ok(user);
        }
        if suffixed {
            return Err(StorageError::Conflict { message }.into());
        }

        debug!(conflict = %message, "nickname taken concurrently, retrying with suffix");
        let mut user = User::from_claims(claims, self.social_type);
        user.nickname = suffixed_nickname(&wanted, &claims.provider_id);
        match self.store.create(user).await {
            Ok(user) => Ok(created(user)),
            Err(StorageError::Conflict { message }) => self
                .lookup(claims)
                .await?
                .ok_or_else(|| StorageError::Conflict { message }.into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup(&self, claims: &ProviderClaims) -> Result<Option<User>, AuthError> {
        if let Some(user) = self
            .store
            .find_by_provider_id(self.social_type, &claims.provider_id)
            .await?
        {
            return Ok(Some(user));
        }
        Ok(self.store.find_by_email(&claims.email).await?)
    }

    async fn available_nickname(&self, wanted: &str, provider_id: &str) -> Result<String, AuthError> {
        let base = truncate(wanted.trim(), MAX_NICKNAME_LEN);
        if !base.is_empty() && self.store.find_by_nickname(&base).await?.is_none() {
            return Ok(base);
        }
        Ok(suffixed_nickname(wanted, provider_id))
    }

    /// Load a user by id.
    pub async fn find(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                UserError::NotFound {
                    id: user_id.to_string(),
                }
                .into()
            })
    }

    /// Change a user's nickname.
    pub async fn change_nickname(&self, user_id: Uuid, nickname: &str) -> Result<User, AuthError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(UserError::NicknameEmpty.into());
        }
        if nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err(UserError::NicknameTooLong {
                max: MAX_NICKNAME_LEN,
            }
            .into());
        }

        let mut user = self.find(user_id).await?;
        if user.nickname == nickname {
            return Ok(user);
        }
        if self.store.find_by_nickname(nickname).await?.is_some() {
            return Err(UserError::NicknameAlreadyExists {
                nickname: nickname.to_string(),
            }
            .into());
        }

        user.nickname = nickname.to_string();
        user.updated_at = Utc::now();
        self.store.update(user).await.map_err(|e| match e {
            StorageError::Conflict { .. } => UserError::NicknameAlreadyExists {
                nickname: nickname.to_string(),
            }
            .into(),
            other => other.into(),
        })
    }

    /// Promote a guest to a full user. No-op for users already promoted.
    pub async fn promote(&self, user_id: Uuid) -> Result<User, AuthError> {
        let mut user = self.find(user_id).await?;
        if user.role == Role::User {
            return Ok(user);
        }
        user.role = Role::User;
        user.updated_at = Utc::now();
        let user = self.store.update(user).await?;
        info!(user_id = %user.id, "promoted guest to user");
        Ok(user)
    }
}

fn created(user: User) -> User {
    info!(user_id = %user.id, social_type = ?user.social_type, "created user on first login");
    user
}

fn suffixed_nickname(wanted: &str, provider_id: &str) -> String {
    let suffix = format!("_{}", provider_id);
    let keep = MAX_NICKNAME_LEN.saturating_sub(suffix.chars().count());
    format!("{}{}", truncate(wanted.trim(), keep), suffix)
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
