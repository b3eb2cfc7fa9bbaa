//! Canonical profile URL handling.
//!
//! An identifier typed into the login form is untrusted text. [`normalize`]
//! turns it into a well-formed URL, and [`ProfileUrl::parse`] additionally
//! enforces the validation rules a profile URL must satisfy before we go
//! anywhere near the network with it.

use core::fmt;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// Errors that can occur when normalizing or validating a profile URL.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// The input could not be parsed as a URL at all.
    #[error("the web address could not be understood as a URL")]
    Unparseable,
    /// The URL carries a username.
    #[error("the URL specified is invalid, as it includes a username")]
    HasUsername,
    /// The URL carries a password.
    #[error("the URL specified is invalid, as it includes a password")]
    HasPassword,
    /// The URL carries an explicit port.
    #[error("the URL specified is invalid, as it includes a port")]
    HasPort,
    /// The URL scheme is something other than http or https.
    #[error("the URL specified is invalid, as its scheme is neither HTTP nor HTTPS")]
    UnsupportedScheme,
    /// The URL carries a fragment.
    #[error("the URL specified is invalid, as it includes a hash/fragment")]
    HasFragment,
    /// The host is a literal IPv4 address.
    #[error("the URL specified is invalid, as its host is an IPv4 address")]
    Ipv4Host,
    /// The host is a literal IPv6 address.
    #[error("the URL specified is invalid, as its host is an IPv6 address")]
    Ipv6Host,
    /// The URL has no host component.
    #[error("the URL specified is invalid, as it has no host")]
    MissingHost,
}

/// Normalize a user-entered identifier into a well-formed URL.
///
/// Lower-cases the input and prepends `http://` when no scheme separator is
/// present. Parsing canonicalizes the rest: a missing path becomes `/` and
/// dot segments are collapsed.
///
/// No validation beyond parseability happens here; see [`ProfileUrl::parse`].
///
/// # Errors
///
/// Returns [`UrlError::Unparseable`] if the input cannot be parsed as a URL.
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let lowered = input.trim().to_lowercase();
    let assumed = if lowered.contains("://") {
        lowered
    } else {
        format!("http://{lowered}")
    };

    Url::parse(&assumed).map_err(|_| UrlError::Unparseable)
}

/// A validated, canonical profile URL.
///
/// ## Constraints
///
/// - Scheme is `http` or `https`
/// - No userinfo, no explicit port, no fragment
/// - Host is a domain name, not an IP literal
///
/// Dot-segment paths are deliberately *not* rejected: the URL parser
/// collapses `.` and `..` segments during canonicalization, so the validator
/// never observes them. This matches the behavior of WHATWG-style URL
/// handling in other clients of the protocol.
///
/// ## Examples
///
/// ```
/// use marigold_core::ProfileUrl;
///
/// let profile = ProfileUrl::parse("EXAMPLE.com").unwrap();
/// assert_eq!(profile.as_str(), "http://example.com/");
///
/// assert!(ProfileUrl::parse("https://user@example.com/").is_err());
/// assert!(ProfileUrl::parse("http://192.168.0.1/").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ProfileUrl(Url);

impl ProfileUrl {
    /// Normalize and validate a user-entered identifier.
    ///
    /// # Errors
    ///
    /// Returns the specific [`UrlError`] for the first rule the URL breaks,
    /// so callers can show the user exactly what was wrong.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        Self::from_url(normalize(input)?)
    }

    /// Validate an already-parsed URL.
    ///
    /// # Errors
    ///
    /// Same rules as [`ProfileUrl::parse`].
    pub fn from_url(url: Url) -> Result<Self, UrlError> {
        if !url.username().is_empty() {
            return Err(UrlError::HasUsername);
        }
        if url.password().is_some() {
            return Err(UrlError::HasPassword);
        }
        if url.port().is_some() {
            return Err(UrlError::HasPort);
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UrlError::UnsupportedScheme);
        }
        if url.fragment().is_some() {
            return Err(UrlError::HasFragment);
        }
        match url.host() {
            Some(Host::Domain(_)) => {}
            Some(Host::Ipv4(_)) => return Err(UrlError::Ipv4Host),
            Some(Host::Ipv6(_)) => return Err(UrlError::Ipv6Host),
            None => return Err(UrlError::MissingHost),
        }

        Ok(Self(url))
    }

    /// Returns the profile URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.0
    }

    /// Consumes the `ProfileUrl` and returns the inner URL.
    #[must_use]
    pub fn into_url(self) -> Url {
        self.0
    }
}

impl fmt::Display for ProfileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<ProfileUrl> for Url {
    fn from(profile: ProfileUrl) -> Self {
        profile.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_user_input() {
        let cases = [
            ("example.com", "http://example.com/"),
            ("EXAMPLE.COM", "http://example.com/"),
            ("HTTP://EXAMPLE.COM", "http://example.com/"),
            ("http://example.com", "http://example.com/"),
            ("https://example.com", "https://example.com/"),
            ("http://example.com/", "http://example.com/"),
            ("https://example.com/", "https://example.com/"),
            ("https://example.com/indieweb", "https://example.com/indieweb"),
            ("192.168.0.1", "http://192.168.0.1/"),
            (
                "[2607:f0d0:1002:0051:0000:0000:0000:0004]",
                "http://[2607:f0d0:1002:51::4]/",
            ),
        ];

        for (given, expected) in cases {
            assert_eq!(normalize(given).unwrap().as_str(), expected, "{given}");
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("Example.com/Path").unwrap();
        let twice = normalize(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_username() {
        assert_eq!(
            ProfileUrl::parse("http://username@example.com/"),
            Err(UrlError::HasUsername)
        );
    }

    #[test]
    fn rejects_password() {
        // The username rule fires first when both are present, so probe the
        // password rule through a URL with an empty username.
        let url = Url::parse("http://:password@example.com/").unwrap();
        assert_eq!(ProfileUrl::from_url(url), Err(UrlError::HasPassword));
    }

    #[test]
    fn rejects_port() {
        assert_eq!(
            ProfileUrl::parse("http://example.com:8080/"),
            Err(UrlError::HasPort)
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert_eq!(
            ProfileUrl::parse("ftp://example.com/"),
            Err(UrlError::UnsupportedScheme)
        );
    }

    #[test]
    fn rejects_fragment() {
        assert_eq!(
            ProfileUrl::parse("http://example.com/indieweb#hello"),
            Err(UrlError::HasFragment)
        );
    }

    #[test]
    fn rejects_ipv4_host() {
        assert_eq!(
            ProfileUrl::parse("http://192.168.0.1"),
            Err(UrlError::Ipv4Host)
        );
    }

    #[test]
    fn rejects_ipv6_host() {
        assert_eq!(
            ProfileUrl::parse("http://[2607:f0d0:1002:0051:0000:0000:0000:0004]"),
            Err(UrlError::Ipv6Host)
        );
    }

    #[test]
    fn accepts_plain_profile_url() {
        let profile = ProfileUrl::parse("https://example.com/indieweb").unwrap();
        assert_eq!(profile.as_str(), "https://example.com/indieweb");
    }

    #[test]
    fn dot_segments_collapse_before_validation() {
        // Known deviation: the parser collapses dot segments, so the
        // validator cannot reject them.
        let profile = ProfileUrl::parse("https://example.com/a/../b").unwrap();
        assert_eq!(profile.as_str(), "https://example.com/b");
    }
}
