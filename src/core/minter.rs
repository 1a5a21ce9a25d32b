//! Token Minter
//!
//! Chooses the local access/refresh token values bound to a new token record.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::types::{
    IssuedTokens, ProviderCredential, SessionConfig, TokenMode, TokenRecord, MAX_TOKEN_TTL_SECS,
};

/// Token minter interface (for dependency injection).
pub trait TokenMinter: Send + Sync {
    /// Issue local tokens for a provider credential.
    ///
    /// `rotating` is the record being replaced on refresh. The returned refresh
    /// token never equals the rotated record's refresh token, nor any refresh
    /// token issued earlier in the same session.
    fn issue(
        &self,
        credential: &ProviderCredential,
        rotating: Option<&TokenRecord>,
        now: DateTime<Utc>,
    ) -> IssuedTokens;
}

/// Uses the provider's tokens as the local tokens.
pub struct PassThroughMinter {
    refresh_token_ttl: std::time::Duration,
}

impl PassThroughMinter {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            refresh_token_ttl: config.refresh_token_ttl,
        }
    }
}

impl TokenMinter for PassThroughMinter {
    fn issue(
        &self,
        credential: &ProviderCredential,
        rotating: Option<&TokenRecord>,
        now: DateTime<Utc>,
    ) -> IssuedTokens {
        // The provider's refresh token is only passed through when the provider
        // rotated it. A kept provider token was already issued locally once.
        let refresh_token = match rotating {
            Some(old)
                if old.provider_credential.refresh_token == credential.refresh_token
                    || old.refresh_token == credential.refresh_token =>
            {
                random_token(32)
            }
            _ => credential.refresh_token.clone(),
        };

        IssuedTokens {
            access_token: credential.access_token.clone(),
            refresh_token,
            expires_at: credential.expires_at,
            refresh_expires_at: credential
                .refresh_expires_at
                .unwrap_or_else(|| now + ttl(self.refresh_token_ttl)),
        }
    }
}

/// Mints random opaque local tokens independent of the provider's.
pub struct OpaqueTokenMinter {
    access_token_ttl: std::time::Duration,
    refresh_token_ttl: std::time::Duration,
}

impl OpaqueTokenMinter {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
        }
    }
}

impl TokenMinter for OpaqueTokenMinter {
    fn issue(
        &self,
        _credential: &ProviderCredential,
        _rotating: Option<&TokenRecord>,
        now: DateTime<Utc>,
    ) -> IssuedTokens {
        IssuedTokens {
            access_token: random_token(32),
            refresh_token: random_token(48),
            expires_at: now + ttl(self.access_token_ttl),
            refresh_expires_at: now + ttl(self.refresh_token_ttl),
        }
    }
}

/// Build the minter selected by the session configuration.
pub fn create_minter(config: &SessionConfig) -> Box<dyn TokenMinter> {
    match config.token_mode {
        TokenMode::PassThrough => Box::new(PassThroughMinter::new(config)),
        TokenMode::Minted => Box::new(OpaqueTokenMinter::new(config)),
    }
}

fn ttl(duration: std::time::Duration) -> Duration {
    Duration::seconds(duration.as_secs().min(MAX_TOKEN_TTL_SECS) as i64)
}

fn random_token(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Short, non-reversible token identifier for logs.
pub fn fingerprint(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn credential(refresh: &str) -> ProviderCredential {
        ProviderCredential {
            access_token: "at2".to_string(),
            refresh_token: refresh.to_string(),
            expires_at: Utc::now() + Duration::hours(6),
            refresh_expires_at: None,
            scopes: Vec::new(),
        }
    }

    fn record(refresh: &str) -> TokenRecord {
        let now = Utc::now();
        TokenRecord::new(
            Uuid::new_v4(),
            IssuedTokens {
                access_token: "at1".to_string(),
                refresh_token: refresh.to_string(),
                expires_at: now,
                refresh_expires_at: now,
            },
            credential(refresh),
            now,
        )
    }

    #[test]
    fn test_pass_through_uses_provider_tokens() {
        let minter = PassThroughMinter::new(&SessionConfig::default());
        let issued = minter.issue(&credential("rt2"), Some(&record("rt1")), Utc::now());

        assert_eq!(issued.access_token, "at2");
        assert_eq!(issued.refresh_token, "rt2");
    }

    #[test]
    fn test_pass_through_rotates_when_provider_keeps_refresh_token() {
        let minter = PassThroughMinter::new(&SessionConfig::default());
        let issued = minter.issue(&credential("rt1"), Some(&record("rt1")), Utc::now());

        assert_ne!(issued.refresh_token, "rt1");
        assert!(!issued.refresh_token.is_empty());
    }

    #[test]
    fn test_pass_through_never_reissues_kept_provider_token() {
        let minter = PassThroughMinter::new(&SessionConfig::default());
        let mut rotated = record("rt1");
        rotated.refresh_token = "local-r1".to_string();

        let issued = minter.issue(&credential("rt1"), Some(&rotated), Utc::now());
        assert_ne!(issued.refresh_token, "rt1");
        assert_ne!(issued.refresh_token, "local-r1");

        let issued = minter.issue(&credential("rt2"), Some(&rotated), Utc::now());
        assert_eq!(issued.refresh_token, "rt2");
    }

    #[test]
    fn test_opaque_minter_ttls() {
        let config = SessionConfig {
            token_mode: TokenMode::Minted,
            access_token_ttl: std::time::Duration::from_secs(60),
            refresh_token_ttl: std::time::Duration::from_secs(120),
        };
        let now = Utc::now();
        let issued = OpaqueTokenMinter::new(&config).issue(&credential("rt"), None, now);

        assert_ne!(issued.access_token, "at2");
        assert_eq!(issued.expires_at, now + Duration::seconds(60));
        assert_eq!(issued.refresh_expires_at, now + Duration::seconds(120));
    }

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        assert_eq!(fingerprint("rt1"), fingerprint("rt1"));
        assert_ne!(fingerprint("rt1"), fingerprint("rt2"));
        assert!(!fingerprint("rt1").contains("rt1"));
        assert_eq!(fingerprint("rt1").len(), 12);
    }
}
