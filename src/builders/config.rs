//! Configuration Builder
//!
//! Fluent builders for provider and session configuration, plus environment loading.

use std::time::Duration;

use crate::error::{AuthError, ConfigurationError};
use crate::types::{
    ProviderConfig, SessionConfig, TokenMode, DEFAULT_PROVIDER_NAME, DEFAULT_TIMEOUT_MS,
    MAX_TOKEN_TTL_SECS,
};
use secrecy::SecretString;
use url::Url;

pub const KAKAO_AUTHORIZATION_ENDPOINT: &str = "https://kauth.kakao.com/oauth/authorize";
pub const KAKAO_TOKEN_ENDPOINT: &str = "https://kauth.kakao.com/oauth/token";
pub const KAKAO_LOGOUT_ENDPOINT: &str = "https://kapi.kakao.com/v1/user/logout";
pub const KAKAO_USER_INFO_ENDPOINT: &str = "https://kapi.kakao.com/v2/user/me";

/// Provider configuration builder.
#[derive(Default)]
pub struct ProviderConfigBuilder {
    name: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_uri: Option<String>,
    authorization_endpoint: Option<String>,
    token_endpoint: Option<String>,
    logout_endpoint: Option<String>,
    user_info_endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ProviderConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the Kakao endpoints.
    pub fn kakao() -> Self {
        Self::new()
            .name("kakao")
            .authorization_endpoint(KAKAO_AUTHORIZATION_ENDPOINT)
            .token_endpoint(KAKAO_TOKEN_ENDPOINT)
            .logout_endpoint(KAKAO_LOGOUT_ENDPOINT)
            .user_info_endpoint(KAKAO_USER_INFO_ENDPOINT)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = Some(endpoint.into());
        self
    }

    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    pub fn logout_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.logout_endpoint = Some(endpoint.into());
        self
    }

    pub fn user_info_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.user_info_endpoint = Some(endpoint.into());
        self
    }

    /// Point every provider endpoint at one base URL (local stubs, tests).
    pub fn base_url(self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorization_endpoint(format!("{}/oauth/authorize", base))
            .token_endpoint(format!("{}/oauth/token", base))
            .logout_endpoint(format!("{}/v1/user/logout", base))
            .user_info_endpoint(format!("{}/v2/user/me", base))
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from `AUTH_PROVIDER_*` environment variables on top of the Kakao preset.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::kakao();

        if let Some(v) = lookup("AUTH_PROVIDER_NAME") {
            builder = builder.name(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_CLIENT_ID") {
            builder = builder.client_id(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_CLIENT_SECRET") {
            builder = builder.client_secret(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_REDIRECT_URI") {
            builder = builder.redirect_uri(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_AUTHORIZATION_URI") {
            builder = builder.authorization_endpoint(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_TOKEN_URI") {
            builder = builder.token_endpoint(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_LOGOUT_URI") {
            builder = builder.logout_endpoint(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_USER_INFO_URI") {
            builder = builder.user_info_endpoint(v);
        }
        if let Some(v) = lookup("AUTH_PROVIDER_TIMEOUT_MS") {
            let ms = parse_number("AUTH_PROVIDER_TIMEOUT_MS", &v)?;
            builder = builder.timeout(Duration::from_millis(ms));
        }

        Ok(builder)
    }

    /// Build the provider configuration.
    pub fn build(self) -> Result<ProviderConfig, AuthError> {
        let client_id = required("client_id", self.client_id)?;
        let client_secret = required("client_secret", self.client_secret)?;

        Ok(ProviderConfig {
            name: self
                .name
                .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            client_id,
            client_secret,
            redirect_uri: endpoint("redirect_uri", self.redirect_uri)?,
            authorization_endpoint: endpoint("authorization_endpoint", self.authorization_endpoint)?,
            token_endpoint: endpoint("token_endpoint", self.token_endpoint)?,
            logout_endpoint: endpoint("logout_endpoint", self.logout_endpoint)?,
            user_info_endpoint: endpoint("user_info_endpoint", self.user_info_endpoint)?,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        })
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, AuthError> {
    value.ok_or_else(|| {
        AuthError::Configuration(ConfigurationError::MissingField {
            field: field.to_string(),
        })
    })
}

fn endpoint(field: &str, value: Option<String>) -> Result<Url, AuthError> {
    let raw = required(field, value)?;
    Url::parse(&raw).map_err(|_| {
        AuthError::Configuration(ConfigurationError::InvalidEndpoint {
            field: field.to_string(),
            url: raw,
        })
    })
}

fn parse_number(field: &str, raw: &str) -> Result<u64, AuthError> {
    raw.trim().parse::<u64>().map_err(|e| {
        AuthError::Configuration(ConfigurationError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })
    })
}

fn parse_ttl(field: &str, raw: &str) -> Result<Duration, AuthError> {
    let secs = parse_number(field, raw)?;
    if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(AuthError::Configuration(ConfigurationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be between 1 and {} seconds", MAX_TOKEN_TTL_SECS),
        }));
    }
    Ok(Duration::from_secs(secs))
}

/// Load session settings from `AUTH_TOKEN_MODE`, `AUTH_ACCESS_TOKEN_TTL_SECS`
/// and `AUTH_REFRESH_TOKEN_TTL_SECS`.
pub fn session_config_from_lookup<F>(lookup: F) -> Result<SessionConfig, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SessionConfig::default();

    if let Some(v) = lookup("AUTH_TOKEN_MODE") {
        config.token_mode = v.parse::<TokenMode>().map_err(|message| {
            AuthError::Configuration(ConfigurationError::InvalidValue {
                field: "AUTH_TOKEN_MODE".to_string(),
                message,
            })
        })?;
    }
    if let Some(v) = lookup("AUTH_ACCESS_TOKEN_TTL_SECS") {
        config.access_token_ttl = parse_ttl("AUTH_ACCESS_TOKEN_TTL_SECS", &v)?;
    }
    if let Some(v) = lookup("AUTH_REFRESH_TOKEN_TTL_SECS") {
        config.refresh_token_ttl = parse_ttl("AUTH_REFRESH_TOKEN_TTL_SECS", &v)?;
    }

    Ok(config)
}

/// Create a new provider configuration builder.
pub fn provider_config() -> ProviderConfigBuilder {
    ProviderConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_success() {
        let config = ProviderConfigBuilder::kakao()
            .client_id("test-client")
            .client_secret("test-secret")
            .redirect_uri("https://app.example.com/auth/callback")
            .build()
            .unwrap();

        assert_eq!(config.client_id, "test-client");
        assert_eq!(config.authorization_endpoint.as_str(), KAKAO_AUTHORIZATION_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(!format!("{:?}", config).contains("test-secret"));
    }

    #[test]
    fn test_builder_missing_client_id() {
        let result = ProviderConfigBuilder::kakao()
            .client_secret("test-secret")
            .redirect_uri("https://app.example.com/auth/callback")
            .build();

        match result {
            Err(AuthError::Configuration(ConfigurationError::MissingField { field })) => {
                assert_eq!(field, "client_id");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_invalid_endpoint() {
        let result = ProviderConfigBuilder::kakao()
            .client_id("c")
            .client_secret("s")
            .redirect_uri("not a url")
            .build();

        assert!(matches!(
            result,
            Err(AuthError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("AUTH_PROVIDER_CLIENT_ID", "env-client"),
            ("AUTH_PROVIDER_CLIENT_SECRET", "env-secret"),
            ("AUTH_PROVIDER_REDIRECT_URI", "http://localhost:8080/auth/callback"),
            ("AUTH_PROVIDER_TOKEN_URI", "http://localhost:9999/oauth/token"),
            ("AUTH_PROVIDER_TIMEOUT_MS", "2500"),
        ]
        .into_iter()
        .collect();

        let config = ProviderConfigBuilder::from_lookup(|k| env.get(k).map(|v| v.to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.client_id, "env-client");
        assert_eq!(config.token_endpoint.as_str(), "http://localhost:9999/oauth/token");
        assert_eq!(config.logout_endpoint.as_str(), KAKAO_LOGOUT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_session_config_from_lookup() {
        let config = session_config_from_lookup(|k| match k {
            "AUTH_TOKEN_MODE" => Some("minted".to_string()),
            "AUTH_ACCESS_TOKEN_TTL_SECS" => Some("600".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.token_mode, TokenMode::Minted);
        assert_eq!(config.access_token_ttl, Duration::from_secs(600));

        let bad = session_config_from_lookup(|k| {
            (k == "AUTH_REFRESH_TOKEN_TTL_SECS").then(|| "soon".to_string())
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_session_config_rejects_out_of_range_ttl() {
        for raw in ["0", "18446744073709551615"] {
            let result = session_config_from_lookup(|k| {
                (k == "AUTH_ACCESS_TOKEN_TTL_SECS").then(|| raw.to_string())
            });
            match result {
                Err(AuthError::Configuration(ConfigurationError::InvalidValue { field, .. })) => {
                    assert_eq!(field, "AUTH_ACCESS_TOKEN_TTL_SECS");
                }
                other => panic!("unexpected result: {:?}", other.map(|_| ())),
            }
        }

        let config = session_config_from_lookup(|k| {
            (k == "AUTH_REFRESH_TOKEN_TTL_SECS").then(|| MAX_TOKEN_TTL_SECS.to_string())
        })
        .unwrap();
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(MAX_TOKEN_TTL_SECS));
    }
}
