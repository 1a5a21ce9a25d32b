//! Token record persistence.

pub mod store;

pub use store::{InMemoryTokenStore, MockTokenStore, StoreOperation, TokenStore};
