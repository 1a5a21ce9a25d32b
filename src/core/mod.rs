//! Core infrastructure: HTTP transport and local token minting.

pub mod minter;
pub mod transport;

pub use minter::{create_minter, fingerprint, OpaqueTokenMinter, PassThroughMinter, TokenMinter};
pub use transport::{
    form_encode, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport, TransportError,
};
