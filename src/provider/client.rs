//! Identity Provider Client
//!
//! Authorization-code exchange, provider token refresh, user info lookup and
//! remote logout against one OAuth2 identity provider.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};
use url::Url;

use crate::core::{form_encode, HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::error::{create_error_from_response, ProviderError};
use crate::types::{KakaoUserInfo, ProviderClaims, ProviderConfig, ProviderTokenResponse};

pub const GRANT_TYPE_AUTH_CODE: &str = "authorization_code";
pub const GRANT_TYPE_REFRESH: &str = "refresh_token";
pub const RESPONSE_TYPE: &str = "code";

/// Provider-side user id echoed by remote logout.
pub type ProviderUserId = String;

/// Identity provider interface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Build the authorization URL the user is redirected to. No network call.
    fn build_authorization_url(&self) -> Url;

    /// Exchange a single-use authorization code. Never retried.
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokenResponse, ProviderError>;

    /// Exchange a provider refresh token for a new provider access token.
    async fn refresh_provider_token(
        &self,
        provider_refresh_token: &str,
    ) -> Result<ProviderTokenResponse, ProviderError>;

    /// Resolve the identity behind a provider access token.
    async fn fetch_user_claims(
        &self,
        provider_access_token: &str,
    ) -> Result<ProviderClaims, ProviderError>;

    /// Ask the provider to end its session. Failures are `RemoteLogoutFailed`.
    async fn revoke_remote_session(
        &self,
        provider_access_token: &str,
    ) -> Result<ProviderUserId, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct LogoutResponse {
    id: serde_json::Value,
}

/// HTTP implementation of [`IdentityProvider`].
pub struct HttpIdentityProvider<T: HttpTransport> {
    config: ProviderConfig,
    transport: Arc<T>,
}

impl<T: HttpTransport> HttpIdentityProvider<T> {
    /// Create new provider client.
    pub fn new(config: ProviderConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn form_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded;charset=utf-8".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());
        headers
    }

    fn bearer_headers(token: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {}", token));
        headers.insert("accept".to_string(), "application/json".to_string());
        headers
    }

    fn build_auth_code_body(&self, code: &str) -> String {
        form_encode(&[
            ("grant_type", GRANT_TYPE_AUTH_CODE),
            ("client_id", &self.config.client_id),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ])
    }

    fn build_refresh_body(&self, refresh_token: &str) -> String {
        form_encode(&[
            ("grant_type", GRANT_TYPE_REFRESH),
            ("client_id", &self.config.client_id),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("refresh_token", refresh_token),
        ])
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let url = request.url.clone();
        let response = self.transport.send(request).await.map_err(|e| {
            error!(provider = %self.config.name, url = %url, error = %e, "provider request failed");
            map_transport_error(e)
        })?;

        if !response.is_success() {
            let err = create_error_from_response(response.status, &response.body);
            match &err {
                ProviderError::InvalidAuthCode { .. } => {
                    error!(provider = %self.config.name, status = response.status, "provider client error")
                }
                _ => error!(provider = %self.config.name, status = response.status, "provider server error"),
            }
            return Err(err);
        }

        Ok(response)
    }

    async fn post_token_grant(
        &self,
        grant_type: &str,
        body: String,
    ) -> Result<ProviderTokenResponse, ProviderError> {
        debug!(provider = %self.config.name, grant_type, "requesting provider token");

        let response = self
            .execute(HttpRequest {
                method: HttpMethod::Post,
                url: self.config.token_endpoint.to_string(),
                headers: Self::form_headers(),
                body: Some(body),
                timeout: Some(self.config.timeout),
            })
            .await?;

        decode(&response.body)
    }
}

fn map_transport_error(error: TransportError) -> ProviderError {
    match error {
        TransportError::Timeout { timeout } => ProviderError::ProviderUnavailable {
            message: format!("request timed out after {:?}", timeout),
            timeout: Some(timeout),
        },
        other => ProviderError::ProviderRequestFailed {
            message: other.to_string(),
        },
    }
}

fn decode<R: serde::de::DeserializeOwned>(body: &str) -> Result<R, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::ProviderRequestFailed {
        message: format!("failed to decode provider response: {}", e),
    })
}

#[async_trait]
impl<T: HttpTransport> IdentityProvider for HttpIdentityProvider<T> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn build_authorization_url(&self) -> Url {
        let mut url = self.config.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("response_type", RESPONSE_TYPE);
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokenResponse, ProviderError> {
        let body = self.build_auth_code_body(code);
        self.post_token_grant(GRANT_TYPE_AUTH_CODE, body).await
    }

    async fn refresh_provider_token(
        &self,
        provider_refresh_token: &str,
    ) -> Result<ProviderTokenResponse, ProviderError> {
        let body = self.build_refresh_body(provider_refresh_token);
        self.post_token_grant(GRANT_TYPE_REFRESH, body).await
    }

    async fn fetch_user_claims(
        &self,
        provider_access_token: &str,
    ) -> Result<ProviderClaims, ProviderError> {
        let response = self
            .execute(HttpRequest {
                method: HttpMethod::Get,
                url: self.config.user_info_endpoint.to_string(),
                headers: Self::bearer_headers(provider_access_token),
                body: None,
                timeout: Some(self.config.timeout),
            })
            .await?;

        let info: KakaoUserInfo = decode(&response.body)?;
        info.into_claims()
            .ok_or_else(|| ProviderError::ProviderRequestFailed {
                message: "user info response has no email".to_string(),
            })
    }

    async fn revoke_remote_session(
        &self,
        provider_access_token: &str,
    ) -> Result<ProviderUserId, ProviderError> {
        let result = self
            .execute(HttpRequest {
                method: HttpMethod::Post,
                url: self.config.logout_endpoint.to_string(),
                headers: Self::bearer_headers(provider_access_token),
                body: None,
                timeout: Some(self.config.timeout),
            })
            .await
            .and_then(|response| decode::<LogoutResponse>(&response.body));

        match result {
            Ok(logout) => Ok(match logout.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            Err(e) => {
                warn!(provider = %self.config.name, error = %e, "remote logout failed");
                Err(ProviderError::RemoteLogoutFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Mock identity provider for testing. Each operation serves queued results in
/// order and falls back to a deterministic default.
#[derive(Default)]
pub struct MockIdentityProvider {
    exchange_results: Mutex<VecDeque<Result<ProviderTokenResponse, ProviderError>>>,
    refresh_results: Mutex<VecDeque<Result<ProviderTokenResponse, ProviderError>>>,
    claims_results: Mutex<VecDeque<Result<ProviderClaims, ProviderError>>>,
    logout_results: Mutex<VecDeque<Result<ProviderUserId, ProviderError>>>,
    exchange_history: Mutex<Vec<String>>,
    refresh_history: Mutex<Vec<String>>,
    logout_history: Mutex<Vec<String>>,
}

impl MockIdentityProvider {
    /// Create new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token response with a six hour access lifetime.
    pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> ProviderTokenResponse {
        ProviderTokenResponse {
            access_token: access_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(21_599),
            refresh_token: refresh_token.map(String::from),
            refresh_token_expires_in: Some(5_183_999),
            scope: Some("account_email profile_nickname".to_string()),
            id_token: None,
            extra: HashMap::new(),
        }
    }

    /// Build claims for a test identity.
    pub fn claims(provider_id: &str, email: &str) -> ProviderClaims {
        ProviderClaims {
            provider_id: provider_id.to_string(),
            email: email.to_string(),
            name: None,
            nickname: Some(format!("nick-{}", provider_id)),
            profile_image: None,
        }
    }

    pub fn queue_exchange(&self, result: Result<ProviderTokenResponse, ProviderError>) -> &Self {
        self.exchange_results.lock().unwrap().push_back(result);
        self
    }

    pub fn queue_refresh(&self, result: Result<ProviderTokenResponse, ProviderError>) -> &Self {
        self.refresh_results.lock().unwrap().push_back(result);
        self
    }

    pub fn queue_claims(&self, result: Result<ProviderClaims, ProviderError>) -> &Self {
        self.claims_results.lock().unwrap().push_back(result);
        self
    }

    pub fn queue_logout(&self, result: Result<ProviderUserId, ProviderError>) -> &Self {
        self.logout_results.lock().unwrap().push_back(result);
        self
    }

    pub fn get_exchange_history(&self) -> Vec<String> {
        self.exchange_history.lock().unwrap().clone()
    }

    pub fn get_refresh_history(&self) -> Vec<String> {
        self.refresh_history.lock().unwrap().clone()
    }

    pub fn get_logout_history(&self) -> Vec<String> {
        self.logout_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn build_authorization_url(&self) -> Url {
        Url::parse("https://mock.example.com/oauth/authorize?response_type=code")
            .expect("static mock URL")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokenResponse, ProviderError> {
        self.exchange_history.lock().unwrap().push(code.to_string());
        let queued = self.exchange_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(Self::token_response(
                &format!("at-{}", code),
                Some(&format!("rt-{}", code)),
            ))
        })
    }

    async fn refresh_provider_token(
        &self,
        provider_refresh_token: &str,
    ) -> Result<ProviderTokenResponse, ProviderError> {
        let count = {
            let mut history = self.refresh_history.lock().unwrap();
            history.push(provider_refresh_token.to_string());
            history.len()
        };
        let queued = self.refresh_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(Self::token_response(
                &format!("refreshed-at-{}", count),
                Some(&format!("refreshed-rt-{}", count)),
            ))
        })
    }

    async fn fetch_user_claims(
        &self,
        _provider_access_token: &str,
    ) -> Result<ProviderClaims, ProviderError> {
        let queued = self.claims_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(Self::claims("1000", "mock@example.com")))
    }

    async fn revoke_remote_session(
        &self,
        provider_access_token: &str,
    ) -> Result<ProviderUserId, ProviderError> {
        self.logout_history
            .lock()
            .unwrap()
            .push(provider_access_token.to_string());
        let queued = self.logout_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok("1000".to_string()))
    }
}
