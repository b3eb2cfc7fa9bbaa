//! Profile resolution and endpoint discovery.
//!
//! Two jobs live here. First, resolving a candidate profile URL through
//! redirect semantics: a temporary redirect (302/307) changes only where we
//! *look* for endpoints, while a permanent one (301/308) migrates the
//! identity itself. Getting that backwards would break the protocol's trust
//! model, so the pair is modeled explicitly as [`ResolvedUrls`].
//!
//! Second, endpoint discovery: HTTP `Link` headers are checked first (from a
//! HEAD request), and only if a wanted endpoint is still missing do we pay
//! for a GET and an HTML parse of `<link rel>` elements.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LINK, LOCATION};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http_client;
use crate::microformats::{self, ProfileCard};

/// Errors that can occur while resolving a profile or discovering endpoints.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A redirect response arrived without a `Location` header.
    #[error("we were given a {kind} redirect to follow but the Location header was missing")]
    MissingLocation {
        /// `"temporary"` or `"permanent"`.
        kind: &'static str,
    },

    /// The `Location` header was not a usable URL.
    #[error("the redirect Location header was not a valid URL")]
    InvalidLocation,

    /// Following a temporary redirect did not produce a success response.
    #[error("we followed a temporary redirect but there was a problem fetching the redirected URL")]
    RedirectFollow,

    /// The discovery HEAD request failed.
    #[error("error while getting headers from your web address (HTTP {status})")]
    UnsuccessfulResponse {
        /// Status of the failed response.
        status: StatusCode,
    },

    /// The fallback GET of the discovery page failed.
    #[error("error while fetching the page source of your web address (HTTP {status})")]
    UnsuccessfulBodyResponse {
        /// Status of the failed response.
        status: StatusCode,
    },

    /// The discovery page was not HTML.
    #[error("the web address did not return HTML content; are the headers set correctly?")]
    NotHtml,
}

/// The outcome of redirect resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrls {
    /// The canonical identity URL.
    pub profile_url: Url,
    /// The URL actually fetched to find endpoint links. Differs from the
    /// profile URL only after a temporary redirect.
    pub discovery_url: Url,
}

/// The endpoint relations we look for during discovery.
///
/// A `microsub` relation may also be present on discovery pages; this client
/// ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRel {
    /// `rel="authorization_endpoint"`
    Authorization,
    /// `rel="token_endpoint"`
    Token,
    /// `rel="micropub"`
    Micropub,
}

impl EndpointRel {
    /// All wanted relations, in discovery order.
    pub const ALL: [Self; 3] = [Self::Authorization, Self::Token, Self::Micropub];

    /// The link relation name.
    #[must_use]
    pub const fn rel_name(self) -> &'static str {
        match self {
            Self::Authorization => "authorization_endpoint",
            Self::Token => "token_endpoint",
            Self::Micropub => "micropub",
        }
    }
}

/// Endpoints found during discovery, keyed by relation.
///
/// Absence of an endpoint is not an error at discovery time; callers decide
/// what is fatal (login cannot proceed without an authorization endpoint,
/// publishing cannot proceed without a micropub endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointSet {
    /// The IndieAuth authorization endpoint.
    pub authorization: Option<Url>,
    /// The IndieAuth token endpoint.
    pub token: Option<Url>,
    /// The Micropub endpoint.
    pub micropub: Option<Url>,
}

impl EndpointSet {
    /// Look up an endpoint by relation.
    #[must_use]
    pub const fn get(&self, rel: EndpointRel) -> Option<&Url> {
        match rel {
            EndpointRel::Authorization => self.authorization.as_ref(),
            EndpointRel::Token => self.token.as_ref(),
            EndpointRel::Micropub => self.micropub.as_ref(),
        }
    }

    /// Record a discovered endpoint under its relation.
    pub fn record(&mut self, rel: EndpointRel, url: Url) {
        match rel {
            EndpointRel::Authorization => self.authorization = Some(url),
            EndpointRel::Token => self.token = Some(url),
            EndpointRel::Micropub => self.micropub = Some(url),
        }
    }

    /// Whether every wanted relation has been found.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        EndpointRel::ALL.iter().all(|rel| self.get(*rel).is_some())
    }
}

/// The combined result of endpoint discovery.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Endpoints found in headers and/or the page body.
    pub endpoints: EndpointSet,
    /// h-card details, populated only when the page body was fetched.
    pub card: ProfileCard,
}

/// Performs redirect resolution and endpoint discovery.
///
/// Holds two HTTP clients: redirect resolution must see redirect responses
/// itself, while everything afterwards follows them (one hop, like the rest
/// of the pipeline).
pub struct Discoverer {
    manual: reqwest::Client,
    following: reqwest::Client,
}

impl Discoverer {
    /// Create a new discoverer.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new() -> Result<Self, DiscoveryError> {
        Ok(Self {
            manual: http_client(reqwest::redirect::Policy::none())?,
            following: http_client(reqwest::redirect::Policy::limited(1))?,
        })
    }

    /// Resolve a candidate URL into its profile and discovery URLs.
    ///
    /// Issues a HEAD request with redirects disabled and interprets the
    /// response:
    ///
    /// - 302/307: identity stays put; discovery moves to the `Location`,
    ///   which must itself answer with a success response
    /// - 301/308: the identity has migrated; both URLs become the `Location`
    /// - anything else: both URLs are the candidate, unchanged
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::MissingLocation`] when a redirect carries no
    /// `Location`, and [`DiscoveryError::RedirectFollow`] when the target of
    /// a temporary redirect cannot be fetched.
    pub async fn resolve_profile(&self, candidate: &Url) -> Result<ResolvedUrls, DiscoveryError> {
        let response = self.manual.head(candidate.clone()).send().await?;
        let status = response.status();

        match status.as_u16() {
            302 | 307 => {
                let location = location_url(&response, candidate, "temporary")?;
                tracing::debug!(%candidate, %location, "following temporary redirect");

                let follow = self.following.get(location.clone()).send().await?;
                if !follow.status().is_success() {
                    return Err(DiscoveryError::RedirectFollow);
                }

                // Identity is NOT the redirect target here.
                Ok(ResolvedUrls {
                    profile_url: candidate.clone(),
                    discovery_url: location,
                })
            }
            301 | 308 => {
                let location = location_url(&response, candidate, "permanent")?;
                tracing::debug!(%candidate, %location, "permanent redirect; identity migrated");

                Ok(ResolvedUrls {
                    profile_url: location.clone(),
                    discovery_url: location,
                })
            }
            _ => Ok(ResolvedUrls {
                profile_url: candidate.clone(),
                discovery_url: candidate.clone(),
            }),
        }
    }

    /// Discover endpoints (and, if the body is fetched, h-card details) at a
    /// discovery URL.
    ///
    /// Headers first: a HEAD request's `Link` headers are scanned for every
    /// wanted relation. Only when one is still missing does the more
    /// expensive GET + HTML parse happen.
    ///
    /// # Errors
    ///
    /// Fails when the HEAD request is unsuccessful, or when a needed
    /// fallback GET is unsuccessful or yields something other than HTML.
    pub async fn discover(&self, discovery_url: &Url) -> Result<Discovery, DiscoveryError> {
        let response = self.following.head(discovery_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::UnsuccessfulResponse { status });
        }

        let links: Vec<LinkEntry> = response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_link_header)
            .collect();

        let mut endpoints = EndpointSet::default();
        for rel in EndpointRel::ALL {
            if let Some(url) = find_endpoint_in_headers(&links, rel.rel_name(), discovery_url) {
                endpoints.record(rel, url);
            }
        }

        if endpoints.is_complete() {
            tracing::debug!(%discovery_url, "all endpoints collected from HTTP headers");
            return Ok(Discovery {
                endpoints,
                card: ProfileCard::default(),
            });
        }

        tracing::debug!(%discovery_url, "endpoints missing from headers; parsing page source");
        let response = self.following.get(discovery_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::UnsuccessfulBodyResponse { status });
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if !is_html {
            return Err(DiscoveryError::NotHtml);
        }

        let body = response.text().await?;
        let document = Html::parse_document(&body);

        for rel in EndpointRel::ALL {
            if endpoints.get(rel).is_none()
                && let Some(url) = find_endpoint_in_body(&document, rel.rel_name(), discovery_url)
            {
                endpoints.record(rel, url);
            }
        }

        let card = microformats::extract_card(&document, discovery_url);

        Ok(Discovery { endpoints, card })
    }
}

fn location_url(
    response: &reqwest::Response,
    base: &Url,
    kind: &'static str,
) -> Result<Url, DiscoveryError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(DiscoveryError::MissingLocation { kind })?;

    // Location may be relative; resolve it against the request URL.
    base.join(location).map_err(|_| DiscoveryError::InvalidLocation)
}

/// A single entry of an HTTP `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkEntry {
    target: String,
    rels: Vec<String>,
}

/// Parse an HTTP `Link` header value into its entries.
///
/// Handles the subset of RFC 8288 that endpoint discovery needs: angled
/// targets and (possibly multi-valued) `rel` parameters.
pub(crate) fn parse_link_header(value: &str) -> Vec<LinkEntry> {
    // Entries are comma-separated, but parameter values may contain commas;
    // a new entry only starts at a `<`.
    let mut raw_entries: Vec<String> = Vec::new();
    for segment in value.split(',') {
        let segment = segment.trim();
        if segment.starts_with('<') {
            raw_entries.push(segment.to_owned());
        } else if let Some(last) = raw_entries.last_mut() {
            last.push(',');
            last.push_str(segment);
        }
    }

    raw_entries.iter().filter_map(|raw| parse_link_entry(raw)).collect()
}

fn parse_link_entry(entry: &str) -> Option<LinkEntry> {
    let rest = entry.strip_prefix('<')?;
    let (target, params) = rest.split_once('>')?;

    let rels = params
        .split(';')
        .filter_map(|param| {
            let (name, value) = param.trim().split_once('=')?;
            name.trim().eq_ignore_ascii_case("rel").then(|| {
                value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
        })
        .next()
        .unwrap_or_default();

    Some(LinkEntry {
        target: target.to_owned(),
        rels,
    })
}

/// Find an endpoint in parsed `Link` headers by relation name.
pub(crate) fn find_endpoint_in_headers(
    links: &[LinkEntry],
    rel_name: &str,
    base: &Url,
) -> Option<Url> {
    links
        .iter()
        .find(|entry| entry.rels.iter().any(|rel| rel == rel_name))
        .and_then(|entry| base.join(&entry.target).ok())
}

/// Find an endpoint among a document's `<link rel>` elements.
pub(crate) fn find_endpoint_in_body(document: &Html, rel_name: &str, base: &Url) -> Option<Url> {
    let Ok(selector) = Selector::parse("link[rel][href]") else {
        return None;
    };

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("rel")
                .is_some_and(|rels| rels.split_whitespace().any(|rel| rel == rel_name))
        })
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| base.join(href).ok())
}
