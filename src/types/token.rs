//! Token Types
//!
//! Provider token responses and the local token record.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::session::SessionState;
use crate::types::MAX_TOKEN_TTL_SECS;

/// Token response from the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderTokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token. Refresh responses may omit it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Refresh token lifetime in seconds.
    #[serde(default)]
    pub refresh_token_expires_in: Option<u64>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// ID token (OIDC).
    #[serde(default)]
    pub id_token: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Provider-side tokens bound to exactly one token record.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ProviderCredential {
    /// Build a credential from a provider response.
    ///
    /// `previous_refresh_token` is kept when the provider does not rotate its own
    /// refresh token. Returns `None` when no refresh token is available at all.
    pub fn from_response(
        response: &ProviderTokenResponse,
        previous_refresh_token: Option<&str>,
        default_ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let refresh_token = response
            .refresh_token
            .clone()
            .or_else(|| previous_refresh_token.map(str::to_string))?;

        let expires_in = response
            .expires_in
            .unwrap_or(default_ttl.as_secs())
            .min(MAX_TOKEN_TTL_SECS);
        let scopes = response
            .scope
            .as_ref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        Some(Self {
            access_token: response.access_token.clone(),
            refresh_token,
            expires_at: now + Duration::seconds(expires_in as i64),
            refresh_expires_at: response
                .refresh_token_expires_in
                .map(|secs| now + Duration::seconds(secs.min(MAX_TOKEN_TTL_SECS) as i64)),
            scopes,
        })
    }
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// The authoritative local record of a session's tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    /// Once true, never reset.
    pub revoked: bool,
    pub provider_credential: ProviderCredential,
}

impl TokenRecord {
    /// Create a new, active record.
    pub fn new(
        user_id: Uuid,
        tokens: IssuedTokens,
        provider_credential: ProviderCredential,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            issued_at,
            expires_at: tokens.expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
            revoked: false,
            provider_credential,
        }
    }

    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        self.refresh_expires_at <= now
    }

    /// Lifecycle state implied by the record.
    pub fn state(&self) -> SessionState {
        if self.revoked {
            SessionState::Revoked
        } else {
            SessionState::Active
        }
    }
}

/// Local token values chosen for a new record.
#[derive(Clone, Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Bearer token wrapper that never prints its value.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Parse an `Authorization` header value, with or without the scheme.
    pub fn parse(header: &str) -> Option<Self> {
        let value = header.trim();
        let token = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            Some(_) => return None,
            None => value,
        };
        if token.is_empty() {
            None
        } else {
            Some(Self(SecretString::new(token.to_string())))
        }
    }

    pub fn secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(refresh: Option<&str>) -> ProviderTokenResponse {
        ProviderTokenResponse {
            access_token: "at1".to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(21599),
            refresh_token: refresh.map(String::from),
            refresh_token_expires_in: Some(5183999),
            scope: Some("profile_nickname account_email".to_string()),
            id_token: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_provider_response_parsing() {
        let json = r#"{
            "token_type": "bearer",
            "access_token": "at1",
            "expires_in": 21599,
            "refresh_token": "rt1",
            "refresh_token_expires_in": 5183999,
            "scope": "account_email profile_nickname"
        }"#;

        let response: ProviderTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "at1");
        assert_eq!(response.refresh_token.as_deref(), Some("rt1"));
        assert_eq!(response.refresh_token_expires_in, Some(5183999));
    }

    #[test]
    fn test_credential_keeps_previous_refresh_token() {
        let now = Utc::now();
        let credential = ProviderCredential::from_response(
            &response(None),
            Some("old-rt"),
            std::time::Duration::from_secs(60),
            now,
        )
        .unwrap();

        assert_eq!(credential.refresh_token, "old-rt");
        assert_eq!(credential.expires_at, now + Duration::seconds(21599));
        assert_eq!(credential.scopes, vec!["profile_nickname", "account_email"]);
    }

    #[test]
    fn test_credential_requires_a_refresh_token() {
        let credential = ProviderCredential::from_response(
            &response(None),
            None,
            std::time::Duration::from_secs(60),
            Utc::now(),
        );
        assert!(credential.is_none());
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(BearerToken::parse("Bearer at1").unwrap().secret(), "at1");
        assert_eq!(BearerToken::parse("bearer  at1 ").unwrap().secret(), "at1");
        assert_eq!(BearerToken::parse("at1").unwrap().secret(), "at1");
        assert!(BearerToken::parse("Basic abc").is_none());
        assert!(BearerToken::parse("Bearer ").is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = ProviderCredential::from_response(
            &response(Some("rt1")),
            None,
            std::time::Duration::from_secs(60),
            Utc::now(),
        )
        .unwrap();
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("at1"));
        assert!(!debug.contains("rt1"));
    }
}
