//! Auth Error Types
//!
//! Error hierarchy for the session lifecycle. Every failure that reaches a caller
//! carries a stable kind, a catalog code and an HTTP status.

use std::time::Duration;
use thiserror::Error;

/// Root error type for session and token operations.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("User error: {0}")]
    User(#[from] UserError),
}

/// Stable, caller-visible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    InvalidConfiguration,
    InvalidAuthCode,
    ProviderUnavailable,
    ProviderRequestFailed,
    RemoteLogoutFailed,
    TokenNotFound,
    TokenExpired,
    TokenRevoked,
    RefreshTokenMismatch,
    RefreshTokenBlacklisted,
    RefreshTokenExpired,
    LogoutFailed,
    InvalidTransition,
    StorageUnavailable,
    StorageConflict,
    RecordNotFound,
    UserNotFound,
    NicknameAlreadyExists,
    NicknameEmpty,
    NicknameTooLong,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "InvalidConfiguration",
            Self::InvalidAuthCode => "InvalidAuthCode",
            Self::ProviderUnavailable => "ProviderUnavailable",
            Self::ProviderRequestFailed => "ProviderRequestFailed",
            Self::RemoteLogoutFailed => "RemoteLogoutFailed",
            Self::TokenNotFound => "TokenNotFound",
            Self::TokenExpired => "TokenExpired",
            Self::TokenRevoked => "TokenRevoked",
            Self::RefreshTokenMismatch => "RefreshTokenMismatch",
            Self::RefreshTokenBlacklisted => "RefreshTokenBlacklisted",
            Self::RefreshTokenExpired => "RefreshTokenExpired",
            Self::LogoutFailed => "LogoutFailed",
            Self::InvalidTransition => "InvalidTransition",
            Self::StorageUnavailable => "StorageUnavailable",
            Self::StorageConflict => "StorageConflict",
            Self::RecordNotFound => "RecordNotFound",
            Self::UserNotFound => "UserNotFound",
            Self::NicknameAlreadyExists => "NicknameAlreadyExists",
            Self::NicknameEmpty => "NicknameEmpty",
            Self::NicknameTooLong => "NicknameTooLong",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthError {
    /// Caller-visible error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::InvalidConfiguration,
            Self::Provider(e) => match e {
                ProviderError::InvalidAuthCode { .. } => ErrorKind::InvalidAuthCode,
                ProviderError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
                ProviderError::ProviderRequestFailed { .. } => ErrorKind::ProviderRequestFailed,
                ProviderError::RemoteLogoutFailed { .. } => ErrorKind::RemoteLogoutFailed,
            },
            Self::Token(e) => match e {
                TokenError::NotFound => ErrorKind::TokenNotFound,
                TokenError::Expired => ErrorKind::TokenExpired,
                TokenError::Revoked => ErrorKind::TokenRevoked,
            },
            Self::Refresh(e) => match e {
                RefreshError::Mismatch => ErrorKind::RefreshTokenMismatch,
                RefreshError::Blacklisted => ErrorKind::RefreshTokenBlacklisted,
                RefreshError::Expired => ErrorKind::RefreshTokenExpired,
            },
            Self::Session(e) => match e {
                SessionError::LogoutFailed { .. } => ErrorKind::LogoutFailed,
                SessionError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            },
            Self::Storage(e) => match e {
                StorageError::Unavailable { .. } => ErrorKind::StorageUnavailable,
                StorageError::Conflict { .. } => ErrorKind::StorageConflict,
                StorageError::NotFound { .. } => ErrorKind::RecordNotFound,
            },
            Self::User(e) => match e {
                UserError::NotFound { .. } => ErrorKind::UserNotFound,
                UserError::NicknameAlreadyExists { .. } => ErrorKind::NicknameAlreadyExists,
                UserError::NicknameEmpty => ErrorKind::NicknameEmpty,
                UserError::NicknameTooLong { .. } => ErrorKind::NicknameTooLong,
            },
        }
    }

    /// Error catalog code.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidConfiguration => "GBL-013",
            ErrorKind::InvalidAuthCode => "AUTH-003",
            ErrorKind::ProviderUnavailable => "KKO-001",
            ErrorKind::ProviderRequestFailed => "KKO-003",
            ErrorKind::RemoteLogoutFailed => "KKO-004",
            ErrorKind::TokenNotFound => "AUTH-005",
            ErrorKind::TokenExpired => "AUTH-002",
            ErrorKind::TokenRevoked => "AUTH-003",
            ErrorKind::RefreshTokenExpired => "AUTH-007",
            ErrorKind::LogoutFailed => "AUTH-012",
            ErrorKind::RefreshTokenBlacklisted => "AUTH-014",
            ErrorKind::RefreshTokenMismatch => "AUTH-015",
            ErrorKind::InvalidTransition => "AUTH-011",
            ErrorKind::StorageUnavailable => "TRX-001",
            ErrorKind::StorageConflict => "AUTH-006",
            ErrorKind::RecordNotFound => "GBL-007",
            ErrorKind::UserNotFound => "USR-001",
            ErrorKind::NicknameAlreadyExists => "USR-002",
            ErrorKind::NicknameEmpty => "USR-003",
            ErrorKind::NicknameTooLong => "USR-004",
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidAuthCode
            | ErrorKind::TokenNotFound
            | ErrorKind::TokenExpired
            | ErrorKind::TokenRevoked
            | ErrorKind::RefreshTokenMismatch
            | ErrorKind::RefreshTokenBlacklisted
            | ErrorKind::RefreshTokenExpired
            | ErrorKind::InvalidTransition => 401,
            ErrorKind::NicknameAlreadyExists | ErrorKind::NicknameTooLong => 400,
            ErrorKind::StorageConflict => 409,
            ErrorKind::UserNotFound | ErrorKind::NicknameEmpty | ErrorKind::RecordNotFound => 404,
            ErrorKind::ProviderUnavailable => 503,
            ErrorKind::InvalidConfiguration
            | ErrorKind::ProviderRequestFailed
            | ErrorKind::RemoteLogoutFailed
            | ErrorKind::LogoutFailed
            | ErrorKind::StorageUnavailable => 500,
        }
    }

    /// Check if the caller must start a new login.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TokenNotFound
                | ErrorKind::TokenExpired
                | ErrorKind::TokenRevoked
                | ErrorKind::RefreshTokenMismatch
                | ErrorKind::RefreshTokenBlacklisted
                | ErrorKind::RefreshTokenExpired
        )
    }

    /// Signals possible token theft.
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::Refresh(RefreshError::Blacklisted))
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL for {field}: {url}")]
    InvalidEndpoint { field: String, url: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Identity provider error. Raw transport failures are translated into these
/// before leaving the provider client.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider rejected the grant (HTTP {status})")]
    InvalidAuthCode { status: u16, description: Option<String> },

    #[error("Provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        timeout: Option<Duration>,
    },

    #[error("Provider request failed: {message}")]
    ProviderRequestFailed { message: String },

    #[error("Remote logout failed: {message}")]
    RemoteLogoutFailed { message: String },
}

/// Access token validation error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Access token not found")]
    NotFound,

    #[error("Access token expired")]
    Expired,

    #[error("Access token revoked")]
    Revoked,
}

/// Refresh path error.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Refresh token does not match any issued session")]
    Mismatch,

    #[error("Refresh token is blacklisted")]
    Blacklisted,

    #[error("Refresh token expired")]
    Expired,
}

/// Session state machine error.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Logout failed: {message}")]
    LogoutFailed { message: String },

    #[error("Invalid session transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

/// Token or user store error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Record not found: {id}")]
    NotFound { id: String },
}

/// User domain error.
#[derive(Error, Debug)]
pub enum UserError {
    #[error("User not found: {id}")]
    NotFound { id: String },

    #[error("Nickname already in use: {nickname}")]
    NicknameAlreadyExists { nickname: String },

    #[error("Nickname must not be empty")]
    NicknameEmpty,

    #[error("Nickname longer than {max} characters")]
    NicknameTooLong { max: usize },
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Provider error payload (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Parse a provider error payload from an HTTP body.
pub fn parse_error_response(body: &str) -> Option<ProviderErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Map a non-success provider HTTP status to a provider error.
pub fn create_error_from_response(status: u16, body: &str) -> ProviderError {
    let description = parse_error_response(body)
        .map(|r| r.error_description.unwrap_or(r.error));

    match status {
        400..=499 => ProviderError::InvalidAuthCode {
            status,
            description,
        },
        500..=599 => ProviderError::ProviderUnavailable {
            message: description.unwrap_or_else(|| format!("HTTP {}", status)),
            timeout: None,
        },
        _ => ProviderError::ProviderRequestFailed {
            message: format!("unexpected HTTP {}", status),
        },
    }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &AuthError) -> String {
    match error.kind() {
        ErrorKind::TokenExpired | ErrorKind::RefreshTokenExpired => {
            "Your session has expired. Please sign in again.".to_string()
        }
        ErrorKind::TokenRevoked | ErrorKind::TokenNotFound => {
            "Your session is no longer valid. Please sign in again.".to_string()
        }
        ErrorKind::RefreshTokenBlacklisted | ErrorKind::RefreshTokenMismatch => {
            "Your session cannot be renewed. Please sign in again.".to_string()
        }
        ErrorKind::InvalidAuthCode => {
            "Sign-in could not be completed. Please try signing in again.".to_string()
        }
        ErrorKind::ProviderUnavailable => {
            "The sign-in service is temporarily unavailable. Please try again later.".to_string()
        }
        ErrorKind::LogoutFailed => "Logout failed. Please try again.".to_string(),
        ErrorKind::NicknameAlreadyExists => "This nickname is already taken.".to_string(),
        _ => "An authentication error occurred. Please try again.".to_string(),
    }
}
