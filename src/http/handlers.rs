//! Axum handlers for the `/auth` endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AuthError, TokenError};
use crate::http::error::HttpError;
use crate::session::SessionManager;
use crate::types::{AuthenticatedSession, BearerToken, LogoutOutcome, Session, User};

/// Header carrying the refresh token in requests and login responses.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Shared handler state.
#[derive(Clone)]
pub struct AuthState {
    pub manager: Arc<SessionManager>,
}

impl AuthState {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

/// Query parameters of the provider redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: User,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            token_type: "Bearer",
            expires_at: session.expires_at,
            refresh_expires_at: session.refresh_expires_at,
            user: session.user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub session: AuthenticatedSession,
}

fn bearer_token(headers: &HeaderMap) -> Result<BearerToken, HttpError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(BearerToken::parse)
        .ok_or_else(|| AuthError::Token(TokenError::NotFound).into())
}

fn session_response(session: Session) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", session.access_token)) {
        headers.insert(header::AUTHORIZATION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&session.refresh_token) {
        headers.insert(REFRESH_TOKEN_HEADER, value);
    }
    (headers, Json(SessionResponse::from(session))).into_response()
}

/// `GET /auth/authorize`: redirect to the provider's consent screen.
pub async fn authorize_handler(State(state): State<AuthState>) -> Redirect {
    Redirect::to(state.manager.authorization_url().as_str())
}

/// `GET|POST /auth/callback?code=...`: complete login.
pub async fn callback_handler(
    State(state): State<AuthState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, HttpError> {
    if let Some(error) = params.error {
        warn!(error = %error, description = ?params.error_description, "provider returned an authorization error");
        return Err(HttpError::BadRequest {
            message: format!("authorization denied: {}", error),
        });
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| HttpError::BadRequest {
            message: "missing authorization code".to_string(),
        })?;

    let session = state.manager.login(&code).await?;
    debug!(user_id = %session.user.id, "login completed");
    Ok(session_response(session))
}

/// `POST /auth/refresh`: rotate the refresh token from the `X-Refresh-Token`
/// header or a `{"refresh_token"}` body.
pub async fn refresh_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let from_header = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let refresh_token = match from_header {
        Some(token) => token,
        None if body.is_empty() => {
            return Err(HttpError::BadRequest {
                message: "missing refresh token".to_string(),
            })
        }
        None => {
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|e| HttpError::BadRequest {
                    message: format!("invalid refresh request: {}", e),
                })?
                .refresh_token
        }
    };

    let session = state.manager.refresh(&refresh_token).await?;
    Ok(session_response(session))
}

/// `POST /auth/logout`: revoke the session behind the bearer token.
pub async fn logout_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<LogoutOutcome>, HttpError> {
    let token = bearer_token(&headers)?;
    let outcome = state.manager.logout(token.secret()).await?;
    Ok(Json(outcome))
}

/// `GET /auth/me`: the user behind the bearer token.
pub async fn me_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, HttpError> {
    let token = bearer_token(&headers)?;
    let (session, user) = state.manager.authenticated_user(token.secret()).await?;
    Ok(Json(MeResponse { user, session }))
}
