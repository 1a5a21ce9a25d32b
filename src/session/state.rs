//! Session State Machine
//!
//! `None -> PendingExchange -> Active -> (Refreshed -> Active)* -> Revoked`.
//! `Revoked` is terminal.

use std::fmt;

use crate::error::SessionError;

/// Lifecycle state of one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session yet.
    None,
    /// Authorization code received, exchange in flight.
    PendingExchange,
    Active,
    /// Provider refresh done, new record not yet committed.
    Refreshed,
    Revoked,
}

/// Events that drive session transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    BeginLogin,
    CodeExchanged,
    ExchangeFailed,
    Refresh,
    Reissued,
    Revoke,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PendingExchange => "pending_exchange",
            Self::Active => "active",
            Self::Refreshed => "refreshed",
            Self::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// Apply an event, rejecting transitions the lifecycle does not allow.
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionEvent::*;
        use SessionState::*;

        let next = match (self, event) {
            (None, BeginLogin) => PendingExchange,
            (PendingExchange, CodeExchanged) => Active,
            (PendingExchange, ExchangeFailed) => None,
            (Active, Refresh) => Refreshed,
            (Refreshed, Reissued) => Active,
            (Active | Refreshed, Revoke) => Revoked,
            (from, event) => {
                return Err(SessionError::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginLogin => "begin_login",
            Self::CodeExchanged => "code_exchanged",
            Self::ExchangeFailed => "exchange_failed",
            Self::Refresh => "refresh",
            Self::Reissued => "reissued",
            Self::Revoke => "revoke",
        };
        f.write_str(name)
    }
}
