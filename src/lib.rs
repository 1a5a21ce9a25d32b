//! Session and Token Lifecycle Service
//!
//! Social login backed by an external OAuth2 identity provider (Kakao by
//! default), with locally issued, revocable, rotating session tokens.
//!
//! # Features
//!
//! - Authorization code login with user resolution on first sign-in
//! - Opaque access tokens validated by store lookup on every call
//! - Refresh token rotation with reuse detection (blacklisting)
//! - Idempotent logout with best-effort remote provider logout
//! - Purging of revoked and expired token records
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adit_auth::{
//!     HttpIdentityProvider, InMemoryTokenStore, InMemoryUserStore, ProviderConfigBuilder,
//!     ReqwestHttpTransport, SessionConfig, SessionManager, UserResolver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfigBuilder::kakao()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .redirect_uri("https://myapp.com/auth/callback")
//!         .build()?;
//!
//!     let provider = Arc::new(HttpIdentityProvider::new(
//!         config,
//!         Arc::new(ReqwestHttpTransport::new()?),
//!     ));
//!     let users = Arc::new(UserResolver::new(Arc::new(InMemoryUserStore::new())));
//!     let manager = SessionManager::new(
//!         provider,
//!         Arc::new(InMemoryTokenStore::new()),
//!         users,
//!         SessionConfig::default(),
//!     );
//!
//!     println!("Sign in at: {}", manager.authorization_url());
//!     let session = manager.login("code-from-callback").await?;
//!     let rotated = manager.refresh(&session.refresh_token).await?;
//!     manager.logout(&rotated.access_token).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, token record, user and session data
//! - `error`: error hierarchy with stable kinds, catalog codes and statuses
//! - `core`: HTTP transport and local token minting
//! - `provider`: identity provider client
//! - `token`: token record store
//! - `user`: user store and resolution
//! - `session`: lifecycle state machine and manager
//! - `http`: axum endpoints
//! - `telemetry`: metric hooks
//! - `builders`: configuration builders

pub mod builders;
pub mod core;
pub mod error;
pub mod http;
pub mod provider;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod types;
pub mod user;

pub use builders::{provider_config, session_config_from_lookup, ProviderConfigBuilder};

pub use error::{
    create_error_from_response, get_user_message, parse_error_response, AuthError, AuthResult,
    ConfigurationError, ErrorKind, ProviderError, ProviderErrorResponse, RefreshError,
    SessionError, StorageError, TokenError, UserError,
};

pub use types::{
    AuthenticatedSession, BearerToken, IssuedTokens, LogoutOutcome, ProviderClaims,
    ProviderConfig, ProviderCredential, ProviderTokenResponse, Role, Session, SessionConfig,
    SocialType, TokenMode, TokenRecord, User,
};

pub use core::{
    create_minter, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    OpaqueTokenMinter, PassThroughMinter, ReqwestHttpTransport, TokenMinter, TransportError,
};

pub use provider::{HttpIdentityProvider, IdentityProvider, MockIdentityProvider};

pub use token::{InMemoryTokenStore, MockTokenStore, StoreOperation, TokenStore};

pub use user::{InMemoryUserStore, UserResolver, UserStore};

pub use session::{SessionEvent, SessionManager, SessionState};

pub use telemetry::{AuthMetrics, InMemoryMetrics, NoOpMetrics};

pub use http::{router, AuthState};
