//! h-card extraction from discovery pages.
//!
//! Only the two properties the app displays are extracted: the user's name
//! (`p-name`) and photo (`u-photo`). Each is independently optional; a page
//! with neither is a perfectly good profile page.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Display details from the first h-card on a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileCard {
    /// `p-name`, if present.
    pub name: Option<String>,
    /// `u-photo` resolved against the page URL, if present.
    pub photo: Option<String>,
}

/// Extract name and photo from the first `h-card` in a parsed document.
#[must_use]
pub fn extract_card(document: &Html, base: &Url) -> ProfileCard {
    let Ok(card_selector) = Selector::parse(".h-card") else {
        return ProfileCard::default();
    };

    document
        .select(&card_selector)
        .next()
        .map_or_else(ProfileCard::default, |card| ProfileCard {
            name: extract_name(card),
            photo: extract_photo(card, base),
        })
}

fn extract_name(card: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse(".p-name").ok()?;
    let element = card.select(&selector).next()?;

    // An <img class="p-name"> carries its name in alt text.
    if let Some(alt) = element.value().attr("alt") {
        return non_empty(alt);
    }

    non_empty(&element.text().collect::<String>())
}

fn extract_photo(card: ElementRef<'_>, base: &Url) -> Option<String> {
    let selector = Selector::parse(".u-photo").ok()?;
    let element = card.select(&selector).next()?;

    let raw = element
        .value()
        .attr("src")
        .or_else(|| element.value().attr("href"))?;

    base.join(raw).ok().map(Into::into)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
