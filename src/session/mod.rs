//! Session lifecycle: login, authentication, refresh rotation and logout.

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{SessionEvent, SessionState};
