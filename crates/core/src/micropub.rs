//! Micropub capability model and query vocabulary.
//!
//! A Micropub server advertises what it supports through `?q=` queries. The
//! combined `config` query *should* answer everything; servers that answer
//! it partially (or not at all) are probed per capability. This module holds
//! the data model those queries populate; issuing them lives in the client
//! crate.

use core::fmt;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The query types understood by a Micropub server's query interface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryType {
    /// Combined configuration query (`q=config`).
    #[serde(rename = "config")]
    Configuration,
    /// Dedicated syndication target query (`q=syndicate-to`).
    #[serde(rename = "syndicate-to")]
    SyndicationTargets,
    /// Dedicated category/tag query (`q=category`).
    #[serde(rename = "category")]
    Categories,
    /// Source content query (`q=source`).
    #[serde(rename = "source")]
    Source,
}

impl QueryType {
    /// The value sent as the `q` query parameter.
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Configuration => "config",
            Self::SyndicationTargets => "syndicate-to",
            Self::Categories => "category",
            Self::Source => "source",
        }
    }

    /// The capability key this query is expected to populate, if it maps to
    /// a single one.
    #[must_use]
    pub const fn capability_key(self) -> Option<&'static str> {
        match self {
            Self::SyndicationTargets => Some("syndicate-to"),
            Self::Categories => Some("categories"),
            Self::Configuration | Self::Source => None,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// A syndication target advertised by the server.
///
/// Opaque passthrough: only the array-of-objects shape is validated; extra
/// keys survive a round trip through the session untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyndicationTarget {
    /// Unique identifier sent back as `mp-syndicate-to`.
    pub uid: String,
    /// Human-readable name shown in the publish forms.
    pub name: String,
    /// Service the target syndicates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
    /// The user's account on that service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    /// Anything else the server chose to include.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything we have learned about a Micropub server.
///
/// Any capability key may be populated either by the combined `config` query
/// or by its dedicated query; `last_fetched` records which queries ran and
/// when, for staleness decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Capabilities {
    /// Raw capability map, keyed by the server's own key names
    /// (`media-endpoint`, `syndicate-to`, `categories`, `post-types`, ...).
    #[serde(default)]
    pub values: Map<String, Value>,
    /// UTC instant each query type last completed successfully.
    #[serde(default, rename = "lastFetched")]
    pub last_fetched: BTreeMap<QueryType, DateTime<Utc>>,
}

impl Capabilities {
    /// Merge a successful query response into the capability map.
    ///
    /// Every top-level key of the response is taken as-is; existing keys are
    /// silently overwritten. The query's `last_fetched` stamp is set to
    /// `now`.
    pub fn merge(&mut self, response: Map<String, Value>, query: QueryType, now: DateTime<Utc>) {
        for (key, value) in response {
            self.values.insert(key, value);
        }
        self.last_fetched.insert(query, now);
    }

    /// Whether a capability key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The media endpoint URL, if advertised.
    #[must_use]
    pub fn media_endpoint(&self) -> Option<&str> {
        self.values.get("media-endpoint").and_then(Value::as_str)
    }

    /// Syndication targets, if advertised and well-shaped.
    #[must_use]
    pub fn syndication_targets(&self) -> Option<Vec<SyndicationTarget>> {
        let value = self.values.get("syndicate-to")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Categories known to the server, if advertised.
    #[must_use]
    pub fn categories(&self) -> Option<Vec<String>> {
        let value = self.values.get("categories")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether the data behind `query` is older than `threshold`.
    ///
    /// Falls back to the `config` stamp when the specific query never ran
    /// standalone; with no stamp at all the data counts as stale.
    #[must_use]
    pub fn is_stale(&self, query: QueryType, threshold: TimeDelta, now: DateTime<Utc>) -> bool {
        let stamp = self
            .last_fetched
            .get(&query)
            .or_else(|| self.last_fetched.get(&QueryType::Configuration));

        stamp.is_none_or(|fetched| now - *fetched > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_overwrites_and_stamps() {
        let mut caps = Capabilities::default();
        let now = Utc::now();

        caps.merge(
            map(json!({ "categories": ["a"], "media-endpoint": "https://media.example/" })),
            QueryType::Configuration,
            now,
        );
        caps.merge(map(json!({ "categories": ["b", "c"] })), QueryType::Categories, now);

        assert_eq!(caps.categories(), Some(vec!["b".to_owned(), "c".to_owned()]));
        assert_eq!(caps.media_endpoint(), Some("https://media.example/"));
        assert_eq!(caps.last_fetched.len(), 2);
    }

    #[test]
    fn syndication_targets_pass_through_extra_keys() {
        let mut caps = Capabilities::default();
        caps.merge(
            map(json!({
                "syndicate-to": [
                    { "uid": "https://archive.org/", "name": "archive.org", "checked": true }
                ]
            })),
            QueryType::SyndicationTargets,
            Utc::now(),
        );

        let targets = caps.syndication_targets().expect("targets");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].uid, "https://archive.org/");
        assert_eq!(targets[0].extra.get("checked"), Some(&json!(true)));
    }

    #[test]
    fn staleness_uses_specific_stamp_then_config() {
        let mut caps = Capabilities::default();
        let now = Utc::now();
        let threshold = TimeDelta::minutes(10);

        // No stamps at all: stale.
        assert!(caps.is_stale(QueryType::Categories, threshold, now));

        // Only a config stamp: categories fall back to it.
        caps.merge(Map::new(), QueryType::Configuration, now - TimeDelta::minutes(20));
        assert!(caps.is_stale(QueryType::Categories, threshold, now));

        // A fresh dedicated stamp wins over the stale config stamp.
        caps.merge(Map::new(), QueryType::Categories, now - TimeDelta::minutes(1));
        assert!(!caps.is_stale(QueryType::Categories, threshold, now));
    }

    #[test]
    fn last_fetched_serializes_under_query_names() {
        let mut caps = Capabilities::default();
        caps.merge(
            Map::new(),
            QueryType::SyndicationTargets,
            "2016-12-21T23:36:07.071Z".parse().expect("timestamp"),
        );

        let value = serde_json::to_value(&caps).expect("serialize");
        assert!(value["lastFetched"]["syndicate-to"].is_string());
    }
}
