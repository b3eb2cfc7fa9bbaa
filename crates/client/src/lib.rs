//! Marigold Client - IndieAuth/Micropub protocol engine.
//!
//! This crate turns an untrusted user-entered identifier into a fully
//! negotiated, authenticated publishing session, one networked step at a
//! time:
//!
//! 1. [`discovery::Discoverer::resolve_profile`] - resolve the identifier
//!    through redirects into a (profile URL, discovery URL) pair
//! 2. [`discovery::Discoverer::discover`] - find the authorization, token,
//!    and micropub endpoints via Link headers, then HTML
//! 3. [`indieauth::IndieAuthClient`] - build the authorization redirect and
//!    exchange the returned code for an access grant
//! 4. [`micropub::MicropubClient::negotiate`] - learn the Micropub server's
//!    capabilities, probing per capability where the combined query falls
//!    short
//! 5. [`publish::prepare_params`] + [`micropub::MicropubClient::create_post`]
//!    - turn a form submission into a protocol-correct publish request
//!
//! Every failure is surfaced once to the caller as a typed error; nothing
//! here retries.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod discovery;
pub mod indieauth;
pub mod microformats;
pub mod micropub;
pub mod publish;

pub use discovery::{Discoverer, DiscoveryError, EndpointSet, ResolvedUrls};
pub use indieauth::{IndieAuthClient, TokenError};
pub use microformats::ProfileCard;
pub use micropub::{MicropubClient, QueryError};
pub use publish::{PublishError, prepare_params};

use std::time::Duration;

/// Per-request timeout on every outbound call.
///
/// The protocol itself specifies no timeouts; this is a deliberate
/// strengthening so a dead server cannot hang a login forever.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a reqwest client with the shared timeout and a redirect policy.
pub(crate) fn http_client(
    redirect: reqwest::redirect::Policy,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .redirect(redirect)
        .build()
}
