//! Session Types
//!
//! Values returned to callers of the lifecycle manager.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{TokenRecord, User};

/// An issued session.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub record_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn new(record: &TokenRecord, user: User) -> Self {
        Self {
            record_id: record.id,
            access_token: record.access_token.clone(),
            refresh_token: record.refresh_token.clone(),
            expires_at: record.expires_at,
            refresh_expires_at: record.refresh_expires_at,
            user,
        }
    }
}

/// Result of validating an access token.
#[derive(Clone, Debug, Serialize)]
pub struct AuthenticatedSession {
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl From<&TokenRecord> for AuthenticatedSession {
    fn from(record: &TokenRecord) -> Self {
        Self {
            record_id: record.id,
            user_id: record.user_id,
            expires_at: record.expires_at,
            scopes: record.provider_credential.scopes.clone(),
        }
    }
}

/// Result of a logout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    pub record_id: Uuid,
    /// Provider user id echoed by a successful remote logout.
    pub remote_user_id: Option<String>,
    /// The record had already been revoked before this call.
    pub already_revoked: bool,
}
