//! Publish request preparation.
//!
//! Browser forms speak in vocabulary-prefixed field names (`e-content`,
//! `u-like-of`) and local wall-clock times; Micropub servers speak in bare
//! property names and UTC instants. [`prepare_params`] is the translation
//! layer, applied in a fixed rule order so collisions resolve the same way
//! every time.

use std::collections::HashSet;

use marigold_core::publish::{DateTimeError, derive_date, slugify};

/// Errors from preparing or submitting a publish request.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The form named no post type vocabulary.
    #[error("no post type (h) was specified for this publishing request")]
    MissingVocabulary,

    /// Publish date/time derivation failed.
    #[error(transparent)]
    Date(#[from] DateTimeError),

    /// Transport-level failure while submitting.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Micropub server rejected the request.
    #[error("the Micropub server reported an error: {error} {description}")]
    Server {
        /// The server's `error` code.
        error: String,
        /// The server's `error_description`, if any.
        description: String,
    },
}

/// Fields that may arrive once or many times and keep their own key.
const MULTI_VALUE_FIELDS: &[&str] = &["mp-syndicate-to", "category"];

/// Form fields consumed by the fixed rules rather than passed through.
const CONSUMED_FIELDS: &[&str] = &[
    "h",
    "mp-slug",
    "mp-syndicate-to",
    "category",
    "date",
    "time",
    "start-date",
    "start-time",
    "end-date",
    "end-time",
    "timezone",
];

/// Transform raw form input into protocol-correct publish parameters.
///
/// Rules, in fixed order:
///
/// 1. `h` must be non-empty.
/// 2. Multi-value fields keep their key when single and gain a `[]` suffix
///    per element when repeated, preserving input order.
/// 3. `mp-slug` is transliterated into a URL-safe slug.
/// 4. A `date`/`time` pair is converted from the submitter's timezone into a
///    UTC `published` instant; absence of the pair is not an error.
/// 5. The same derivation applies to the optional event `start`/`end` pairs.
/// 6. Every remaining field maps from its vocabulary-prefixed key to the
///    bare property name; on collision the first-seen value wins.
///
/// # Errors
///
/// [`PublishError::MissingVocabulary`] for a missing `h`, and a distinct
/// [`DateTimeError`] for a malformed date, malformed time, or unrecognized
/// timezone.
pub fn prepare_params(
    form: &[(String, String)],
    timezone: &str,
) -> Result<Vec<(String, String)>, PublishError> {
    let mut params: Vec<(String, String)> = Vec::new();

    let vocabulary = first_value(form, "h").ok_or(PublishError::MissingVocabulary)?;
    params.push(("h".to_owned(), vocabulary.to_owned()));

    for field in MULTI_VALUE_FIELDS {
        let values: Vec<&str> = form
            .iter()
            .filter(|(key, value)| key == field && !value.is_empty())
            .map(|(_, value)| value.as_str())
            .collect();

        match values.as_slice() {
            [] => {}
            [single] => params.push(((*field).to_owned(), (*single).to_owned())),
            many => {
                for value in many {
                    params.push((format!("{field}[]"), (*value).to_owned()));
                }
            }
        }
    }

    if let Some(raw_slug) = first_value(form, "mp-slug") {
        params.push(("mp-slug".to_owned(), slugify(raw_slug)));
    }

    set_date(&mut params, form, "published", "date", "time", timezone)?;
    set_date(&mut params, form, "start", "start-date", "start-time", timezone)?;
    set_date(&mut params, form, "end", "end-date", "end-time", timezone)?;

    let mut seen: HashSet<String> = params.iter().map(|(key, _)| key.clone()).collect();
    for (key, value) in form {
        if CONSUMED_FIELDS.contains(&key.as_str()) || value.is_empty() {
            continue;
        }

        let property = derive_property(key);
        if seen.insert(property.to_owned()) {
            params.push((property.to_owned(), value.clone()));
        }
        // Later values for an already-seen property are dropped silently.
    }

    Ok(params)
}

/// Derive the bare property name from a vocabulary-prefixed form key.
///
/// Strips everything up to and including the first hyphen: `e-content`
/// becomes `content`, `u-like-of` becomes `like-of`. Keys without a prefix
/// pass through unchanged.
#[must_use]
pub fn derive_property(key: &str) -> &str {
    key.split_once('-').map_or(key, |(_, rest)| rest)
}

fn first_value<'f>(form: &'f [(String, String)], key: &str) -> Option<&'f str> {
    form.iter()
        .find(|(field, value)| field == key && !value.is_empty())
        .map(|(_, value)| value.as_str())
}

fn set_date(
    params: &mut Vec<(String, String)>,
    form: &[(String, String)],
    property: &str,
    date_field: &str,
    time_field: &str,
    timezone: &str,
) -> Result<(), PublishError> {
    // The downstream server defaults to "now" when the pair is absent.
    if let (Some(date), Some(time)) = (first_value(form, date_field), first_value(form, time_field))
    {
        params.push((property.to_owned(), derive_date(date, time, timezone)?));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    fn get<'p>(params: &'p [(String, String)], key: &str) -> Option<&'p str> {
        params
            .iter()
            .find(|(field, _)| field == key)
            .map(|(_, value)| value.as_str())
    }

    fn get_all<'p>(params: &'p [(String, String)], key: &str) -> Vec<&'p str> {
        params
            .iter()
            .filter(|(field, _)| field == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    #[test]
    fn fails_without_a_vocabulary() {
        let input = form(&[("date", "2020-02-02"), ("time", "02:02"), ("e-content", "Foo bar")]);

        assert!(matches!(
            prepare_params(&input, "Asia/Kolkata"),
            Err(PublishError::MissingVocabulary)
        ));
    }

    #[test]
    fn missing_date_time_is_not_an_error() {
        let input = form(&[("h", "entry"), ("e-content", "Foo bar")]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(get(&params, "h"), Some("entry"));
        assert_eq!(get(&params, "content"), Some("Foo bar"));
        assert_eq!(get(&params, "published"), None);
    }

    #[test]
    fn derives_published_from_local_pair() {
        let input = form(&[
            ("h", "entry"),
            ("date", "2020-08-21"),
            ("time", "12:17"),
            ("e-content", "Foo"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(get(&params, "published"), Some("2020-08-21T06:47:00.000Z"));
    }

    #[test]
    fn event_start_and_end_derive_independently() {
        let input = form(&[
            ("h", "event"),
            ("p-name", "Homebrew Website Club"),
            ("start-date", "2020-08-21"),
            ("start-time", "18:00"),
            ("end-date", "2020-08-21"),
            ("end-time", "19:00"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(get(&params, "start"), Some("2020-08-21T12:30:00.000Z"));
        assert_eq!(get(&params, "end"), Some("2020-08-21T13:30:00.000Z"));
        assert_eq!(get(&params, "name"), Some("Homebrew Website Club"));
    }

    #[test]
    fn rsvp_fields_map_to_bare_properties() {
        let input = form(&[
            ("h", "entry"),
            ("u-in-reply-to", "https://events.example/hwc"),
            ("p-rsvp", "yes"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(
            get(&params, "in-reply-to"),
            Some("https://events.example/hwc")
        );
        assert_eq!(get(&params, "rsvp"), Some("yes"));
    }

    #[test]
    fn bad_date_components_surface_as_errors() {
        for (date, time, zone) in [
            ("2020/08/20", "14:45", "Asia/Kolkata"),
            ("2020-08-20", "14.45", "Asia/Kolkata"),
            ("2020-08-20", "14:45", "Asia"),
        ] {
            let input = form(&[("h", "entry"), ("date", date), ("time", time)]);
            assert!(
                matches!(prepare_params(&input, zone), Err(PublishError::Date(_))),
                "{date} {time} {zone}"
            );
        }
    }

    #[test]
    fn single_syndication_target_keeps_its_key() {
        let input = form(&[
            ("h", "entry"),
            ("mp-syndicate-to", "https://mastodon.social/@example"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(
            get(&params, "mp-syndicate-to"),
            Some("https://mastodon.social/@example")
        );
        assert!(get_all(&params, "mp-syndicate-to[]").is_empty());
    }

    #[test]
    fn repeated_syndication_targets_gain_array_suffix_in_order() {
        let input = form(&[
            ("h", "entry"),
            ("mp-syndicate-to", "https://mastodon.social/@example"),
            ("mp-syndicate-to", "https://mastodon.social/@example2"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(
            get_all(&params, "mp-syndicate-to[]"),
            vec![
                "https://mastodon.social/@example",
                "https://mastodon.social/@example2"
            ]
        );
        assert!(get(&params, "mp-syndicate-to").is_none());
    }

    #[test]
    fn empty_syndication_target_is_dropped() {
        let input = form(&[("h", "entry"), ("mp-syndicate-to", "")]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert!(get(&params, "mp-syndicate-to").is_none());
    }

    #[test]
    fn slug_is_transliterated() {
        let input = form(&[("h", "entry"), ("mp-slug", "I'm graduating!")]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(get(&params, "mp-slug"), Some("im-graduating"));
    }

    #[test]
    fn vocabulary_prefixes_strip_to_property_names() {
        let cases = [
            ("h-entry", "entry"),
            ("h-review", "review"),
            ("h-resume", "resume"),
            ("h-event", "event"),
            ("h-cite", "cite"),
            ("u-url", "url"),
            ("u-in-reply-to", "in-reply-to"),
            ("u-like-of", "like-of"),
            ("u-repost-of", "repost-of"),
            ("p-name", "name"),
            ("p-summary", "summary"),
            ("e-content", "content"),
            ("content", "content"),
        ];

        for (given, expected) in cases {
            assert_eq!(derive_property(given), expected, "{given}");
        }
    }

    #[test]
    fn first_seen_property_wins_on_collision() {
        let input = form(&[
            ("h", "entry"),
            ("e-content", "first"),
            ("p-content", "second"),
        ]);
        let params = prepare_params(&input, "Asia/Kolkata").expect("params");

        assert_eq!(get_all(&params, "content"), vec!["first"]);
    }
}
