//! Error responses for the HTTP surface.
//!
//! Every failure renders as `{"code", "kind", "message"}` with the status the
//! error kind maps to.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{get_user_message, AuthError};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub kind: String,
    pub message: String,
}

/// Handler error.
#[derive(Debug)]
pub enum HttpError {
    Auth(AuthError),
    /// Malformed request, rejected before reaching the session manager.
    BadRequest { message: String },
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        Self::Auth(error)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(error) => error.into_response(),
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    code: "GBL-001",
                    kind: "InvalidRequest".to_string(),
                    message,
                }),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            code: self.code(),
            kind: self.kind().to_string(),
            message: get_user_message(&self),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("Bearer error=\"invalid_token\", error_description=\"{}\"", self.kind());
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}
