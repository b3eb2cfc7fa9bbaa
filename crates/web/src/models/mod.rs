//! Data models for the web front-end.

pub mod session;

pub use session::keys as session_keys;
pub use session::{CurrentUser, LoginAttempt, Preferences};
