//! Session-related types.
//!
//! Everything Marigold knows about a user lives in the session: who they
//! are, where their endpoints live, the access grant, and what their
//! Micropub server can do. Nothing survives the session.

use serde::{Deserialize, Serialize};
use url::Url;

/// Session-stored user identity.
///
/// Built during login from redirect resolution and the h-card on the
/// profile page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The user's identity URL, as presented to authorization servers.
    pub profile_url: Url,
    /// The URL endpoint discovery ran against (may differ after a
    /// temporary redirect).
    pub discovery_url: Url,
    /// Display name from the profile page's h-card.
    pub name: Option<String>,
    /// Photo URL from the profile page's h-card.
    pub photo: Option<String>,
}

impl CurrentUser {
    /// The name shown in page headers: h-card name, else the bare domain.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.profile_url.host_str())
            .unwrap_or("you")
    }
}

/// Per-user preferences captured at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// IANA timezone name used to interpret publish-form date/time pairs.
    pub timezone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// An in-flight login, created when the user is redirected to their
/// authorization endpoint and consumed on the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Random state value for CSRF protection, verified on the callback.
    pub state: String,
}

/// Session keys for authentication and publishing data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the discovered endpoint set.
    pub const ENDPOINTS: &str = "endpoints";

    /// Key for the in-flight login attempt (CSRF state).
    pub const LOGIN_ATTEMPT: &str = "login_attempt";

    /// Key for the access grant from the token endpoint.
    pub const ACCESS_GRANT: &str = "access_grant";

    /// Key for negotiated Micropub capabilities.
    pub const CAPABILITIES: &str = "capabilities";

    /// Key for per-user preferences.
    pub const PREFERENCES: &str = "preferences";

    /// Key for the permalink of the most recently created post.
    pub const LAST_POST: &str = "last_post";
}
