//! Session Manager
//!
//! Drives every session transition: login by authorization code, access token
//! validation, refresh token rotation and logout. Tokens never appear in logs;
//! only their fingerprints do.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::{create_minter, fingerprint, TokenMinter};
use crate::error::{
    AuthError, ProviderError, RefreshError, SessionError, StorageError, TokenError,
};
use crate::provider::IdentityProvider;
use crate::session::state::{SessionEvent, SessionState};
use crate::telemetry::{AuthMetrics, NoOpMetrics};
use crate::token::TokenStore;
use crate::types::{
    AuthenticatedSession, LogoutOutcome, ProviderCredential, ProviderTokenResponse, Session,
    SessionConfig, TokenRecord, User,
};
use crate::user::UserResolver;

/// Session lifecycle manager. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<dyn TokenStore>,
    users: Arc<UserResolver>,
    minter: Arc<dyn TokenMinter>,
    metrics: Arc<dyn AuthMetrics>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager with the minter selected by `config` and no-op metrics.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        tokens: Arc<dyn TokenStore>,
        users: Arc<UserResolver>,
        config: SessionConfig,
    ) -> Self {
        Self {
            provider,
            tokens,
            users,
            minter: Arc::from(create_minter(&config)),
            metrics: Arc::new(NoOpMetrics),
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AuthMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_minter(mut self, minter: Arc<dyn TokenMinter>) -> Self {
        self.minter = minter;
        self
    }

    pub fn users(&self) -> &UserResolver {
        &self.users
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Provider authorization URL to redirect the user to.
    pub fn authorization_url(&self) -> Url {
        self.provider.build_authorization_url()
    }

    fn failed(&self, operation: &str, err: AuthError) -> AuthError {
        self.metrics.record_error(err.kind().as_str(), operation);
        err
    }

    /// Exchange an authorization code and open a session.
    ///
    /// Work after a successful exchange runs on a spawned task, so dropping the
    /// returned future does not abandon the grant half-persisted.
    pub async fn login(&self, code: &str) -> Result<Session, AuthError> {
        let provider = self.provider.name().to_string();
        let state = SessionState::None.transition(SessionEvent::BeginLogin)?;
        debug!(provider = %provider, state = %state, "exchanging authorization code");

        let started = Instant::now();
        let exchanged = self.provider.exchange_code(code).await;
        self.metrics
            .record_provider_duration("exchange_code", started.elapsed().as_secs_f64() * 1000.0);

        let response = match exchanged {
            Ok(response) => response,
            Err(e) => {
                let state = state.transition(SessionEvent::ExchangeFailed)?;
                warn!(provider = %provider, error = %e, state = %state, "authorization code exchange failed");
                self.metrics.record_login(&provider, false);
                return Err(self.failed("login", e.into()));
            }
        };
        let state = state.transition(SessionEvent::CodeExchanged)?;

        let this = self.clone();
        let task = tokio::spawn(async move { this.complete_login(response, Utc::now()).await });
        let result = task.await.unwrap_or_else(|e| {
            Err(StorageError::Unavailable {
                message: format!("login task aborted: {}", e),
            }
            .into())
        });

        match result {
            Ok(session) => {
                self.metrics.record_login(&provider, true);
                info!(
                    provider = %provider,
                    user_id = %session.user.id,
                    record_id = %session.record_id,
                    access = %fingerprint(&session.access_token),
                    state = %state,
                    "session opened"
                );
                Ok(session)
            }
            Err(e) => {
                self.metrics.record_login(&provider, false);
                Err(self.failed("login", e))
            }
        }
    }

    async fn complete_login(
        &self,
        response: ProviderTokenResponse,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let credential =
            ProviderCredential::from_response(&response, None, self.config.access_token_ttl, now)
                .ok_or_else(|| ProviderError::ProviderRequestFailed {
                    message: "token response carries no refresh token".to_string(),
                })?;

        let claims = self
            .provider
            .fetch_user_claims(&credential.access_token)
            .await
            .map_err(|e| {
                error!(
                    provider_access = %fingerprint(&credential.access_token),
                    error = %e,
                    "orphaned provider grant: user info lookup failed"
                );
                e
            })?;
        let user = self.users.resolve(&claims).await?;

        let issued = self.minter.issue(&credential, None, now);
        let record = TokenRecord::new(user.id, issued, credential, now);
        let session = Session::new(&record, user);

        if let Err(e) = self.tokens.save(record).await {
            error!(
                user_id = %session.user.id,
                provider_access = %fingerprint(&session.access_token),
                error = %e,
                "orphaned provider grant: token record not persisted"
            );
            return Err(e.into());
        }
        Ok(session)
    }

    /// Validate a local access token.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedSession, AuthError> {
        match self.check_access_token(access_token, Utc::now()).await {
            Ok(record) => {
                self.metrics.record_authentication("ok");
                Ok(AuthenticatedSession::from(&record))
            }
            Err(e) => {
                self.metrics.record_authentication(e.kind().as_str());
                debug!(access = %fingerprint(access_token), error = %e, "access token rejected");
                Err(e)
            }
        }
    }

    /// Validate a local access token and load its user.
    pub async fn authenticated_user(
        &self,
        access_token: &str,
    ) -> Result<(AuthenticatedSession, User), AuthError> {
        let session = self.authenticate(access_token).await?;
        let user = self.users.find(session.user_id).await?;
        Ok((session, user))
    }

    async fn check_access_token(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, AuthError> {
        let record = self
            .tokens
            .find_by_access_token(access_token)
            .await?
            .ok_or(TokenError::NotFound)?;

        if record.revoked {
            return Err(TokenError::Revoked.into());
        }
        if record.is_access_expired(now) {
            return Err(TokenError::Expired.into());
        }
        Ok(record)
    }

    /// Rotate a refresh token: the presented token is revoked and a new pair
    /// issued. A revoked token presented again is reported as blacklisted.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let provider = self.provider.name().to_string();
        let presented = fingerprint(refresh_token);

        let record = match self.tokens.find_by_refresh_token(refresh_token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(refresh = %presented, "unknown refresh token presented");
                self.metrics.record_token_refresh(&provider, false);
                return Err(self.failed("refresh", RefreshError::Mismatch.into()));
            }
            Err(e) => {
                self.metrics.record_token_refresh(&provider, false);
                return Err(self.failed("refresh", e.into()));
            }
        };

        if record.revoked {
            self.report_reuse(&provider, &record, &presented);
            return Err(self.failed("refresh", RefreshError::Blacklisted.into()));
        }
        if record.is_refresh_expired(Utc::now()) {
            info!(record_id = %record.id, refresh = %presented, "expired refresh token presented");
            self.metrics.record_token_refresh(&provider, false);
            return Err(self.failed("refresh", RefreshError::Expired.into()));
        }
        let state = record.state().transition(SessionEvent::Refresh)?;

        let started = Instant::now();
        let refreshed = self
            .provider
            .refresh_provider_token(&record.provider_credential.refresh_token)
            .await;
        self.metrics
            .record_provider_duration("refresh_token", started.elapsed().as_secs_f64() * 1000.0);

        let response = match refreshed {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = %provider, record_id = %record.id, error = %e, "provider refresh failed");
                self.metrics.record_token_refresh(&provider, false);
                return Err(self.failed("refresh", e.into()));
            }
        };

        let this = self.clone();
        let task =
            tokio::spawn(async move { this.complete_refresh(record, response, state, Utc::now()).await });
        let result = task.await.unwrap_or_else(|e| {
            Err(StorageError::Unavailable {
                message: format!("refresh task aborted: {}", e),
            }
            .into())
        });

        self.metrics.record_token_refresh(&provider, result.is_ok());
        result.map_err(|e| self.failed("refresh", e))
    }

    async fn complete_refresh(
        &self,
        old: TokenRecord,
        response: ProviderTokenResponse,
        state: SessionState,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let credential = ProviderCredential::from_response(
            &response,
            Some(&old.provider_credential.refresh_token),
            self.config.access_token_ttl,
            now,
        )
        .ok_or_else(|| ProviderError::ProviderRequestFailed {
            message: "refresh response carries no refresh token".to_string(),
        })?;

        let user = self.users.find(old.user_id).await?;
        let issued = self.minter.issue(&credential, Some(&old), now);
        let record = TokenRecord::new(old.user_id, issued, credential, now);
        let session = Session::new(&record, user);

        match self.tokens.replace(old.id, record).await {
            Ok(()) => {
                let state = state.transition(SessionEvent::Reissued)?;
                info!(
                    user_id = %old.user_id,
                    old_record_id = %old.id,
                    record_id = %session.record_id,
                    refresh = %fingerprint(&session.refresh_token),
                    state = %state,
                    "refresh token rotated"
                );
                Ok(session)
            }
            Err(StorageError::Conflict { message }) => {
                // Superseded by a concurrent refresh or login, not a replay.
                warn!(
                    user_id = %old.user_id,
                    record_id = %old.id,
                    conflict = %message,
                    "refresh lost to a concurrent rotation"
                );
                Err(RefreshError::Blacklisted.into())
            }
            Err(StorageError::NotFound { .. }) => Err(RefreshError::Mismatch.into()),
            Err(e) => {
                error!(
                    record_id = %old.id,
                    error = %e,
                    "orphaned provider grant: rotated record not persisted"
                );
                Err(e.into())
            }
        }
    }

    fn report_reuse(&self, provider: &str, record: &TokenRecord, presented: &str) {
        error!(
            user_id = %record.user_id,
            record_id = %record.id,
            refresh = %presented,
            "revoked refresh token presented, possible token theft"
        );
        self.metrics.record_refresh_token_reuse(provider);
    }

    /// End the session behind an access token. Logging out an already revoked
    /// session succeeds without contacting the provider.
    pub async fn logout(&self, access_token: &str) -> Result<LogoutOutcome, AuthError> {
        let provider = self.provider.name().to_string();
        let record = self
            .tokens
            .find_by_access_token(access_token)
            .await
            .map_err(|e| self.failed("logout", e.into()))?
            .ok_or_else(|| self.failed("logout", TokenError::NotFound.into()))?;

        if record.revoked {
            debug!(record_id = %record.id, "logout of revoked session");
            self.metrics.record_logout(true);
            return Ok(LogoutOutcome {
                record_id: record.id,
                remote_user_id: None,
                already_revoked: true,
            });
        }
        let state = record.state().transition(SessionEvent::Revoke)?;

        let remote_user_id = match self
            .provider
            .revoke_remote_session(&record.provider_credential.access_token)
            .await
        {
            Ok(id) => {
                self.metrics.record_remote_logout(&provider, true);
                Some(id)
            }
            Err(e) => {
                warn!(provider = %provider, record_id = %record.id, error = %e, "remote logout failed, revoking locally");
                self.metrics.record_remote_logout(&provider, false);
                None
            }
        };

        if let Err(e) = self.tokens.revoke(record.id).await {
            error!(record_id = %record.id, error = %e, "local revocation failed");
            return Err(self.failed(
                "logout",
                SessionError::LogoutFailed {
                    message: e.to_string(),
                }
                .into(),
            ));
        }

        info!(user_id = %record.user_id, record_id = %record.id, state = %state, "session revoked");
        self.metrics.record_logout(false);
        Ok(LogoutOutcome {
            record_id: record.id,
            remote_user_id,
            already_revoked: false,
        })
    }

    /// Delete revoked and refresh-expired records. Their tokens then read as
    /// unknown.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let purged = self.tokens.purge_expired(Utc::now()).await?;
        self.metrics.record_purge(purged);
        info!(purged, "purged token records");
        Ok(purged)
    }
}
