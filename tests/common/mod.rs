//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use adit_auth::{
    HttpIdentityProvider, IdentityProvider, InMemoryMetrics, InMemoryTokenStore,
    InMemoryUserStore, ProviderConfigBuilder, ReqwestHttpTransport, SessionConfig,
    SessionManager, UserResolver,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a session manager over the given provider with in-memory stores.
pub fn manager_with(
    provider: Arc<dyn IdentityProvider>,
    config: SessionConfig,
) -> (SessionManager, Arc<InMemoryMetrics>) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let users = Arc::new(UserResolver::new(Arc::new(InMemoryUserStore::new())));
    let manager = SessionManager::new(provider, Arc::new(InMemoryTokenStore::new()), users, config)
        .with_metrics(metrics.clone());
    (manager, metrics)
}

/// HTTP provider client pointed at a mock server.
pub fn http_provider(server: &MockServer, timeout: Duration) -> Arc<dyn IdentityProvider> {
    let config = ProviderConfigBuilder::new()
        .name("kakao")
        .client_id("test-client")
        .client_secret("test-secret")
        .redirect_uri("http://localhost:8080/auth/callback")
        .base_url(&server.uri())
        .timeout(timeout)
        .build()
        .expect("valid provider config");
    let transport = Arc::new(ReqwestHttpTransport::new().expect("transport"));
    Arc::new(HttpIdentityProvider::new(config, transport))
}

pub fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "token_type": "bearer",
        "access_token": access,
        "expires_in": 21599,
        "scope": "account_email profile_nickname"
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
        body["refresh_token_expires_in"] = json!(5183999);
    }
    body
}

pub fn user_body(id: i64, email: &str, nickname: &str) -> serde_json::Value {
    json!({
        "id": id,
        "kakao_account": {
            "email": email,
            "profile": {"nickname": nickname, "profile_image_url": "https://img.example.com/p.png"}
        }
    })
}

/// Mount a token endpoint answer for one grant type.
pub async fn mount_token(server: &MockServer, grant: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains(format!("grant_type={}", grant)))
        .respond_with(response)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

pub async fn mount_user_info(server: &MockServer, access: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .and(header("authorization", format!("Bearer {}", access).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
