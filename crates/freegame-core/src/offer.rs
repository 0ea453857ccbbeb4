//! Normalized representation of one free-game announcement.
//!
//! An [`Offer`] is produced by a feed collaborator and consumed by the
//! delivery pipeline. Its serde form doubles as the cache snapshot value, so
//! field additions must remain backward-compatible with older cache files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub title: String,
    pub summary: String,
    /// Link to the feed announcement itself.
    pub origin_link: String,
    /// Direct redemption link, when the announcement carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_link: Option<String>,
    /// Store page for the game, when the announcement carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Set by the orchestrator after a confirmed send, never by the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_through_at: Option<DateTime<Utc>>,
    /// Human-readable rendering of `good_through_at` in the configured
    /// timezone, e.g. "Monday 21-Dec at 9AM +00:00".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_through_text: Option<String>,
}

impl Offer {
    pub fn new(title: impl Into<String>, summary: impl Into<String>, origin_link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            origin_link: origin_link.into(),
            offer_link: None,
            store_link: None,
            published_at: None,
            posted_at: None,
            good_through_at: None,
            good_through_text: None,
        }
    }

    /// An offer with no `good_through_at` is open-ended and never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.good_through_at {
            Some(good_through) => now >= good_through,
            None => false,
        }
    }

    /// Every link the announcement carries, for ignore-by-URL checks.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.origin_link.as_str())
            .chain(self.offer_link.as_deref())
            .chain(self.store_link.as_deref())
    }
}

// Title is the practical identity key; two announcements for the same game
// are the same offer even when their summaries differ.
impl PartialEq for Offer {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
    }
}

impl Eq for Offer {}
