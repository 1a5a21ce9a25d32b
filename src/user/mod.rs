//! Local users and their resolution from provider identity.

pub mod resolver;
pub mod store;

pub use resolver::{UserResolver, MAX_NICKNAME_LEN};
pub use store::{InMemoryUserStore, UserStore};
