//! Feed for the Steam "freegamesfinders" community announcements.

use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::rss::{self, RawItem};
use super::{Feed, FeedSettings};
use crate::error::Result;
use crate::offer::Offer;

pub const DEFAULT_URL: &str = "https://steamcommunity.com/groups/freegamesfinders/rss/";

const HTTP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug)]
pub struct SteamFeed {
    url: String,
    start_date: Option<NaiveDate>,
    timezone: FixedOffset,
    http: Client,
}

impl SteamFeed {
    pub fn new(settings: &FeedSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            url: settings
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            start_date: settings.start_date,
            timezone: settings.timezone,
            http,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn to_offer(&self, item: &RawItem) -> Offer {
        let published_at = parse_pubdate(&item.published);
        let year_hint = published_at.unwrap_or_else(Utc::now).year();
        let (good_through_at, good_through_text) =
            parse_good_through(&item.summary, self.timezone, year_hint);

        let mut offer = Offer::new(&item.title, &item.summary, &item.link);
        offer.offer_link = parse_redemption_link(&item.summary);
        offer.store_link = parse_store_link(&item.summary);
        offer.published_at = published_at;
        offer.good_through_at = good_through_at;
        offer.good_through_text = good_through_text;
        offer
    }

    fn keep_for_start_date(&self, offer: &Offer) -> bool {
        let Some(start_date) = self.start_date else {
            return true;
        };
        // Items the feed did not date are kept; only provably-old ones drop.
        match offer.published_at {
            Some(published_at) => {
                let floor = start_date
                    .and_time(NaiveTime::MIN)
                    .and_utc();
                if published_at >= floor {
                    true
                } else {
                    debug!(title = %offer.title, %published_at, "item published before start_date");
                    false
                }
            }
            None => true,
        }
    }
}

impl Feed for SteamFeed {
    fn fetch(&self, count: usize) -> Result<Vec<Offer>> {
        let response = self.http.get(&self.url).send()?.error_for_status()?;
        let body = response.text()?;

        let items = rss::items(&body);
        debug!(count = items.len(), url = %self.url, "fetched feed items");

        Ok(items
            .iter()
            .take(count)
            .map(|item| self.to_offer(item))
            .filter(|offer| self.keep_for_start_date(offer))
            .collect())
    }
}

/// RSS `pubDate` is RFC 2822: "Wed, 30 Dec 2020 16:00:01 +0000".
fn parse_pubdate(raw: &str) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!(raw, error = %err, "could not parse pubdate");
            None
        }
    }
}

/// Extracts "Offer good through December 21, 1600 GMT" from the summary and
/// renders it in the display timezone. The announcement omits the year, so
/// the caller supplies one (normally the publication year).
fn parse_good_through(
    summary: &str,
    display_tz: FixedOffset,
    year_hint: i32,
) -> (Option<DateTime<Utc>>, Option<String>) {
    let Some(phrase) = good_through_phrase(summary) else {
        return (None, None);
    };

    let mut parts: Vec<&str> = phrase.split_whitespace().collect();
    let Some(zone_abbrev) = parts.pop() else {
        return (None, None);
    };
    let Some(offset) = offset_for_abbreviation(zone_abbrev) else {
        warn!(phrase, "unrecognized timezone in good-through date");
        return (None, None);
    };

    let with_year = format!("{} {year_hint}", parts.join(" "));
    let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, "%B %d, %H%M %Y") else {
        warn!(phrase, "could not parse good-through date");
        return (None, None);
    };
    let Some(instant) = naive.and_local_timezone(offset).single() else {
        return (None, None);
    };

    let local = instant.with_timezone(&display_tz);
    let text = local.format("%A %-d-%b at %-I%p %:z").to_string();
    (Some(instant.with_timezone(&Utc)), Some(text))
}

/// The date text between "Offer good through/thru " and the next "<br".
fn good_through_phrase(summary: &str) -> Option<&str> {
    let start = ["Offer good through ", "Offer good thru "]
        .iter()
        .find_map(|marker| summary.find(marker).map(|idx| idx + marker.len()))?;
    let rest = &summary[start..];
    let end = rest.find("<br").unwrap_or(rest.len());
    let phrase = rest[..end].trim();
    (!phrase.is_empty()).then_some(phrase)
}

fn offset_for_abbreviation(abbrev: &str) -> Option<FixedOffset> {
    let hours = match abbrev.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" => 0,
        "EST" | "CDT" => -5,
        "EDT" => -4,
        "CST" => -6,
        "MST" | "PDT" => -7,
        "MDT" => -6,
        "PST" => -8,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// First store.steampowered.com link in the summary markup.
fn parse_store_link(summary: &str) -> Option<String> {
    extract_href(summary, "https://store.steampowered.com")
}

/// Direct redemption link, unwrapped from the Steam community link filter.
fn parse_redemption_link(summary: &str) -> Option<String> {
    let href = extract_href(summary, "https://steamcommunity.com/linkfilter")?;
    let (_, target) = href.split_once("url=")?;
    (!target.is_empty()).then(|| target.to_string())
}

fn extract_href(markup: &str, prefix: &str) -> Option<String> {
    let marker = format!("href=\"{prefix}");
    let start = markup.find(&marker)? + "href=\"".len();
    let rest = &markup[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
