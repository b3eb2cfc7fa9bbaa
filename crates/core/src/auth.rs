//! Access grants issued by an IndieAuth token endpoint.

use serde::{Deserialize, Serialize};

/// Default token type when a server leaves it unspecified elsewhere.
///
/// A grant produced by a token exchange always carries an explicit type; the
/// default only applies when filling in session state that never saw one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// A validated access grant for the user's Micropub server.
///
/// Produced exactly once per login by the token exchange. The intermediate
/// authorization code never appears here; it is discarded the moment the
/// exchange completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessGrant {
    /// The profile URL this grant was issued for.
    pub me: String,
    /// The bearer credential itself.
    pub access_token: String,
    /// Token type as issued, e.g. `Bearer`.
    pub token_type: String,
    /// Space-separated scopes the user consented to.
    pub scope: String,
}

impl AccessGrant {
    /// Render the `Authorization` header value for requests to the user's
    /// Micropub server.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
