//! Identity provider client.

pub mod client;

pub use client::{
    HttpIdentityProvider, IdentityProvider, MockIdentityProvider, ProviderUserId,
    GRANT_TYPE_AUTH_CODE, GRANT_TYPE_REFRESH, RESPONSE_TYPE,
};
