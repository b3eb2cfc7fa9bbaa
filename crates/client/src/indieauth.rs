//! IndieAuth authorization and token exchange.
//!
//! The authorization half is a browser redirect, so the client only builds
//! the URL. The token half is ours: POST the authorization code to the token
//! endpoint and validate what comes back, strictly in order - a token
//! without a type is unusable, and a token without a scope was issued
//! incorrectly, not merely incompletely.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use marigold_core::AccessGrant;

use crate::http_client;

/// Errors that can occur during the token exchange.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Transport-level failure, including an unreadable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response carried no `access_token`.
    #[error("we did not receive an access token from the token endpoint")]
    MissingAccessToken,

    /// The response carried a token but no `token_type`.
    #[error("we received an access token but not the access token type from the token endpoint")]
    MissingTokenType,

    /// The response carried a token and type but no `scope`.
    #[error(
        "we received an access token and its type without any scope; this token was issued incorrectly"
    )]
    MissingScope,
}

/// Raw token endpoint response before validation.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    me: Option<String>,
}

/// Client for the user's IndieAuth endpoints.
///
/// Carries this app's own identity (`client_id`, `redirect_uri`); the
/// endpoints themselves come from discovery and differ per user.
pub struct IndieAuthClient {
    http: reqwest::Client,
    client_id: String,
    redirect_uri: String,
}

impl IndieAuthClient {
    /// Create a new IndieAuth client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(client_id: &str, redirect_uri: &str) -> Result<Self, TokenError> {
        Ok(Self {
            http: http_client(reqwest::redirect::Policy::limited(1))?,
            client_id: client_id.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
        })
    }

    /// The `client_id` presented to authorization servers.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build the authorization URL the browser is redirected to.
    ///
    /// `state` must be a per-session random value; it comes back on the
    /// callback and is verified there.
    #[must_use]
    pub fn authorization_url(&self, authorization_endpoint: &Url, me: &Url, state: &str) -> Url {
        let mut url = authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("me", me.as_str())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", "create")
            .append_pair("response_type", "code");
        url
    }

    /// Exchange an authorization code for an access grant.
    ///
    /// The caller must discard the code immediately after this returns,
    /// success or not; it is single-use.
    ///
    /// # Errors
    ///
    /// Validation runs in order: a missing `access_token`, `token_type`, or
    /// `scope` each yield their own [`TokenError`].
    pub async fn exchange_code(
        &self,
        token_endpoint: &Url,
        me: &Url,
        code: &str,
    ) -> Result<AccessGrant, TokenError> {
        tracing::debug!(%token_endpoint, "exchanging authorization code for a token");

        let params = [
            ("me", me.as_str()),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(token_endpoint.clone())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let token: TokenResponse = response.json().await?;

        let access_token = token.access_token.ok_or(TokenError::MissingAccessToken)?;
        let token_type = token.token_type.ok_or(TokenError::MissingTokenType)?;
        let scope = token.scope.ok_or(TokenError::MissingScope)?;

        Ok(AccessGrant {
            me: token.me.unwrap_or_else(|| me.as_str().to_owned()),
            access_token,
            token_type,
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_every_parameter() {
        let client = IndieAuthClient::new(
            "https://app.example/",
            "https://app.example/login/callback/",
        )
        .expect("client");

        let endpoint = Url::parse("https://indieauth.com/auth").expect("endpoint");
        let me = Url::parse("https://example.com/").expect("me");
        let url = client.authorization_url(&endpoint, &me, "state123");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("me".to_owned(), "https://example.com/".to_owned()),
                ("client_id".to_owned(), "https://app.example/".to_owned()),
                (
                    "redirect_uri".to_owned(),
                    "https://app.example/login/callback/".to_owned()
                ),
                ("state".to_owned(), "state123".to_owned()),
                ("scope".to_owned(), "create".to_owned()),
                ("response_type".to_owned(), "code".to_owned()),
            ]
        );
    }
}
