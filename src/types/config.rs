//! Configuration Types
//!
//! Identity provider and session configuration. Both are immutable once built
//! and injected at construction.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Identity provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider name used in logs and metrics.
    pub name: String,
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: SecretString,
    /// Registered redirect URI.
    pub redirect_uri: Url,
    /// Authorization endpoint URL.
    pub authorization_endpoint: Url,
    /// Token endpoint URL.
    pub token_endpoint: Url,
    /// Logout endpoint URL.
    pub logout_endpoint: Url,
    /// User info endpoint URL.
    pub user_info_endpoint: Url,
    /// Timeout for each outbound request.
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("authorization_endpoint", &self.authorization_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("logout_endpoint", &self.logout_endpoint.as_str())
            .field("user_info_endpoint", &self.user_info_endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// How local tokens relate to provider tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// Local tokens are the provider tokens.
    #[default]
    PassThrough,
    /// Local tokens are random opaque strings minted by this service.
    Minted,
}

impl std::str::FromStr for TokenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pass_through" | "passthrough" | "pass-through" => Ok(Self::PassThrough),
            "minted" => Ok(Self::Minted),
            other => Err(format!("unknown token mode '{}'", other)),
        }
    }
}

/// Local session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Local token mode.
    pub token_mode: TokenMode,
    /// Access token lifetime when minting or when the provider omits one.
    pub access_token_ttl: Duration,
    /// Refresh token lifetime when minting or when the provider omits one.
    pub refresh_token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_mode: TokenMode::default(),
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL_SECS),
        }
    }
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 14 * 24 * 60 * 60;
pub const DEFAULT_PROVIDER_NAME: &str = "kakao";

/// Upper bound for any token lifetime, configured or provider-supplied.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;
