//! Offer eligibility rules: ignore lists and expiry.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::offer::Offer;

/// Case-insensitive substring patterns against offer titles and links.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgnoreRules {
    pub titles: Vec<String>,
    pub urls: Vec<String>,
}

impl IgnoreRules {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.urls.is_empty()
    }
}

fn matches_pattern(haystack: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&pattern.to_lowercase())
}

fn is_ignored_by_title(offer: &Offer, rules: &IgnoreRules) -> bool {
    rules
        .titles
        .iter()
        .any(|pattern| matches_pattern(&offer.title, pattern))
}

fn is_ignored_by_url(offer: &Offer, rules: &IgnoreRules) -> bool {
    for pattern in &rules.urls {
        for link in offer.links() {
            if matches_pattern(link, pattern) {
                debug!(link, pattern = %pattern, "ignoring offer by url");
                return true;
            }
        }
    }
    false
}

/// Decides whether an offer should be considered for delivery at all.
///
/// Pure function of its inputs. Checks short-circuit in order: ignored by
/// title, ignored by URL, expired.
#[must_use]
pub fn is_eligible(offer: &Offer, rules: &IgnoreRules, now: DateTime<Utc>) -> bool {
    if is_ignored_by_title(offer, rules) {
        debug!(title = %offer.title, "ignoring offer by title");
        return false;
    }
    if is_ignored_by_url(offer, rules) {
        return false;
    }
    if offer.is_expired(now) {
        debug!(title = %offer.title, "offer expired");
        return false;
    }
    true
}
