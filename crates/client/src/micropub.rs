//! Micropub capability negotiation and post submission.
//!
//! The negotiation is a small state machine over the server's query
//! interface: try the combined `config` query, then probe each capability
//! that is still missing with its dedicated query. The probes run
//! concurrently with each other, but only once the config query's outcome is
//! known; the first probe to fail fails the whole negotiation.

use chrono::Utc;
use futures::future::try_join_all;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use marigold_core::{AccessGrant, Capabilities, QueryType};

use crate::http_client;
use crate::publish::PublishError;

/// Errors from the Micropub query interface.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered the query with a non-success status.
    #[error(
        "we did not receive a successful response from your Micropub server for our {query} query request"
    )]
    UnsuccessfulResponse {
        /// Which query failed.
        query: QueryType,
        /// Status of the failed response.
        status: StatusCode,
    },

    /// The server answered successfully but not with JSON.
    #[error(
        "we received a successful response from your Micropub server for our {query} query request, but the server did not send JSON data"
    )]
    NonJsonResponse {
        /// Which query failed.
        query: QueryType,
    },

    /// The response body was JSON but not an object.
    #[error("the {query} query response is not a JSON object")]
    NotAnObject {
        /// Which query failed.
        query: QueryType,
    },

    /// A syndication target response without a `syndicate-to` key.
    #[error("the syndication target response is missing the syndicate-to key")]
    MissingSyndicateTo,
}

/// Error body a Micropub server may send on a failed publish.
#[derive(Debug, Default, Deserialize)]
struct MicropubErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for the user's Micropub endpoint.
pub struct MicropubClient {
    http: reqwest::Client,
}

impl MicropubClient {
    /// Create a new Micropub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, QueryError> {
        Ok(Self {
            http: http_client(reqwest::redirect::Policy::limited(1))?,
        })
    }

    /// Issue a single `?q=` query and validate its response shape.
    ///
    /// # Errors
    ///
    /// Non-success status, non-JSON content, non-object bodies, and (for the
    /// syndication query) a missing `syndicate-to` key each yield their own
    /// [`QueryError`] naming the query type.
    pub async fn query_server(
        &self,
        endpoint: &Url,
        grant: &AccessGrant,
        query: QueryType,
    ) -> Result<Map<String, Value>, QueryError> {
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("q", query.as_query());

        tracing::debug!(%url, %query, "sending a query request to the Micropub server");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, grant.authorization_header())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::UnsuccessfulResponse { query, status });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        if !is_json {
            return Err(QueryError::NonJsonResponse { query });
        }

        let body: Value = response.json().await?;
        validate_query_response(query, body)
    }

    /// Learn the server's capabilities, filling `capabilities` in place.
    ///
    /// The combined `config` query runs first; its failure is logged but
    /// never fatal on its own. Dedicated queries then fire concurrently for
    /// each capability still absent. Negotiation succeeds only when every
    /// required-but-missing capability was eventually obtained.
    ///
    /// # Errors
    ///
    /// The first failing dedicated query fails the negotiation; results of
    /// the other in-flight queries are discarded.
    pub async fn negotiate(
        &self,
        endpoint: &Url,
        grant: &AccessGrant,
        capabilities: &mut Capabilities,
    ) -> Result<(), QueryError> {
        match self
            .query_server(endpoint, grant, QueryType::Configuration)
            .await
        {
            Ok(config) => capabilities.merge(config, QueryType::Configuration, Utc::now()),
            Err(error) => {
                tracing::debug!(%error, "configuration query failed; trying dedicated queries");
            }
        }

        let missing: Vec<QueryType> = [QueryType::SyndicationTargets, QueryType::Categories]
            .into_iter()
            .filter(|query| {
                query
                    .capability_key()
                    .is_some_and(|key| !capabilities.has(key))
            })
            .collect();

        let fetched = try_join_all(missing.into_iter().map(|query| async move {
            let data = self.query_server(endpoint, grant, query).await?;
            Ok::<_, QueryError>((query, data))
        }))
        .await?;

        for (query, data) in fetched {
            capabilities.merge(data, query, Utc::now());
        }

        Ok(())
    }

    /// Submit a prepared publish request.
    ///
    /// Returns the created post's permalink when the server provides a
    /// `Location` header.
    ///
    /// # Errors
    ///
    /// A non-success response is surfaced as [`PublishError::Server`] with
    /// whatever `error`/`error_description` the server included.
    pub async fn create_post(
        &self,
        endpoint: &Url,
        grant: &AccessGrant,
        params: &[(String, String)],
    ) -> Result<Option<Url>, PublishError> {
        tracing::debug!(%endpoint, "sending publish request to the Micropub server");

        let response = self
            .http
            .post(endpoint.clone())
            .header(AUTHORIZATION, grant.authorization_header())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: MicropubErrorBody = response.json().await.unwrap_or_default();
            tracing::error!(
                %status,
                error = body.error.as_deref().unwrap_or("unknown"),
                "received an error from the Micropub server"
            );
            return Err(PublishError::Server {
                error: body.error.unwrap_or_else(|| format!("HTTP {status}")),
                description: body.error_description.unwrap_or_default(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| endpoint.join(value).ok());

        Ok(location)
    }
}

fn validate_query_response(
    query: QueryType,
    body: Value,
) -> Result<Map<String, Value>, QueryError> {
    let Value::Object(map) = body else {
        return Err(QueryError::NotAnObject { query });
    };

    if query == QueryType::SyndicationTargets && !map.contains_key("syndicate-to") {
        return Err(QueryError::MissingSyndicateTo);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn syndication_response_must_be_an_object() {
        let body = json!([
            { "uid": "https://archive.org/", "name": "archive.org" },
            { "uid": "https://wikimedia.org/", "name": "WikiMedia" }
        ]);

        assert!(matches!(
            validate_query_response(QueryType::SyndicationTargets, body),
            Err(QueryError::NotAnObject { query: QueryType::SyndicationTargets })
        ));
    }

    #[test]
    fn syndication_response_must_carry_its_key() {
        let body = json!({ "uid": "https://archive.org/", "name": "archive.org" });

        assert!(matches!(
            validate_query_response(QueryType::SyndicationTargets, body),
            Err(QueryError::MissingSyndicateTo)
        ));
    }

    #[test]
    fn other_queries_only_require_an_object() {
        let body = json!({ "categories": ["tag1", "tag2"] });
        let map = validate_query_response(QueryType::Categories, body).expect("valid");
        assert!(map.contains_key("categories"));

        let empty = validate_query_response(QueryType::Configuration, json!({})).expect("valid");
        assert!(empty.is_empty());
    }
}
