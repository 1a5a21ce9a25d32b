//! Types
//!
//! Data structures shared across the provider client, stores and lifecycle manager.

pub mod config;
pub mod session;
pub mod token;
pub mod user;

pub use config::*;
pub use session::*;
pub use token::*;
pub use user::*;
