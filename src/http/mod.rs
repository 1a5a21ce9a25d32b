//! HTTP surface.
//!
//! - `GET /auth/authorize`
//! - `GET|POST /auth/callback?code=...`
//! - `POST /auth/refresh`
//! - `POST /auth/logout`
//! - `GET /auth/me`

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

pub use error::{ErrorBody, HttpError};
pub use handlers::{AuthState, REFRESH_TOKEN_HEADER};

/// Build the `/auth` router.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/authorize", get(handlers::authorize_handler))
        .route(
            "/auth/callback",
            get(handlers::callback_handler).post(handlers::callback_handler),
        )
        .route("/auth/refresh", post(handlers::refresh_handler))
        .route("/auth/logout", post(handlers::logout_handler))
        .route("/auth/me", get(handlers::me_handler))
        .with_state(state)
}
