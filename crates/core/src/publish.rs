//! Slug and publish-date derivation for outgoing posts.
//!
//! Both functions exist to turn what a browser form hands us into what a
//! Micropub server expects: URL-safe slugs and absolute UTC instants.

use chrono::{LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Symbols that transliterate to words instead of vanishing into a hyphen.
const SYMBOL_WORDS: &[(char, &str)] = &[
    ('$', "dollar"),
    ('%', "percent"),
    ('&', "and"),
    ('<', "less"),
    ('>', "greater"),
    ('|', "or"),
];

/// Derive a URL-safe slug from free text.
///
/// Lower-cases, maps a handful of symbols to words (`$` becomes `dollar`),
/// drops apostrophes entirely, and collapses every other non-alphanumeric
/// run into a single hyphen with no leading or trailing hyphen.
///
/// # Examples
///
/// ```
/// use marigold_core::slugify;
///
/// assert_eq!(slugify("hello world"), "hello-world");
/// assert_eq!(slugify("I'm graduating!"), "im-graduating");
/// assert_eq!(slugify("foo $ bar"), "foo-dollar-bar");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_break = false;

    for ch in input.chars() {
        if let Some(word) = symbol_word(ch) {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str(word);
            pending_break = true;
        } else if ch.is_ascii_alphanumeric() {
            if pending_break && !out.is_empty() {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            pending_break = false;
        } else if matches!(ch, '\'' | '\u{2019}') {
            // Apostrophes are elided, not hyphenated: "I'm" -> "im".
        } else if !out.is_empty() {
            pending_break = true;
        }
    }

    out
}

fn symbol_word(ch: char) -> Option<&'static str> {
    SYMBOL_WORDS
        .iter()
        .find(|(symbol, _)| *symbol == ch)
        .map(|(_, word)| *word)
}

/// Errors from converting a browser-submitted local date and time to UTC.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    /// The date was not in `YYYY-MM-DD` form.
    #[error("the publish date must be in YYYY-MM-DD form")]
    InvalidDate,
    /// The time was not in `HH:MM` form.
    #[error("the publish time must be in HH:MM form")]
    InvalidTime,
    /// The timezone is not a recognized IANA zone name.
    #[error("{0} is not a recognized timezone")]
    UnknownTimezone(String),
    /// The local date-time does not exist in the given zone (DST gap).
    #[error("that date and time does not exist in the given timezone")]
    NonexistentLocalTime,
}

/// Convert a browser-submitted local date and time into an absolute UTC
/// instant in extended ISO-8601 form.
///
/// The date and time arrive in the submitter's declared timezone; the result
/// is what gets sent to the Micropub server.
///
/// # Errors
///
/// Each malformed component yields its own [`DateTimeError`]; none of them
/// escape as a panic.
///
/// # Examples
///
/// ```
/// use marigold_core::derive_date;
///
/// let published = derive_date("2020-08-20", "14:45", "Asia/Kolkata").unwrap();
/// assert_eq!(published, "2020-08-20T09:15:00.000Z");
/// ```
pub fn derive_date(date: &str, time: &str, timezone: &str) -> Result<String, DateTimeError> {
    let date =
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| DateTimeError::InvalidDate)?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| DateTimeError::InvalidTime)?;
    let zone: Tz = timezone
        .parse()
        .map_err(|_| DateTimeError::UnknownTimezone(timezone.to_owned()))?;

    let local = match zone.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(instant) => instant,
        // A clock rolled back twice over this wall time; take the earlier.
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => return Err(DateTimeError::NonexistentLocalTime),
    };

    Ok(local
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string())
}
