//! Delivery fan-out: one polling pass across configured feeds and channels.
//!
//! The pass runs strictly sequentially. Dedup correctness depends on the
//! check-then-act sequence around the cache staying uninterrupted, which the
//! single-threaded model gives for free; parallelizing the fan-out would
//! require turning `contains` + `add` into an atomic compare-and-insert.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::OfferCache;
use crate::config::Config;
use crate::error::Result;
use crate::feed::{FeedRegistry, FeedSettings};
use crate::filter::is_eligible;
use crate::notify::{NotifierRegistry, NotifierSettings};
use crate::offer::Offer;

/// Offers fetched per feed endpoint per pass.
const FEED_ITEM_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Eligible offers seen across all feeds.
    pub offers: usize,
    /// Confirmed sends, each backed by a new cache entry.
    pub sent: usize,
    /// Deliveries skipped because the cache already held their fingerprint.
    pub skipped: usize,
    /// Send attempts that failed or were not confirmed; retried next pass.
    pub failed: usize,
}

pub struct App<'a> {
    config: &'a Config,
    cache: &'a mut OfferCache,
    feeds: &'a FeedRegistry,
    notifiers: &'a NotifierRegistry,
    dry_run: bool,
}

impl<'a> App<'a> {
    pub fn new(
        config: &'a Config,
        cache: &'a mut OfferCache,
        feeds: &'a FeedRegistry,
        notifiers: &'a NotifierRegistry,
        dry_run: bool,
    ) -> Self {
        Self {
            config,
            cache,
            feeds,
            notifiers,
            dry_run,
        }
    }

    /// Runs one polling pass: every configured feed endpoint, fanned out to
    /// every configured channel endpoint. Per-feed and per-endpoint failures
    /// are contained and logged; only configuration-level problems surface.
    pub fn run_pass(&mut self) -> Result<PassSummary> {
        let config = self.config;
        let timezone = config.utc_offset()?;
        let mut summary = PassSummary::default();

        // Names missing from either the registry or the configuration are
        // skipped without comment; the intersection is the work list.
        for (name, urls) in &config.feeds {
            if !self.feeds.is_registered(name) {
                continue;
            }
            for url in urls.resolved() {
                let settings = FeedSettings {
                    url: url.map(ToString::to_string),
                    start_date: config.start_date,
                    timezone,
                };
                self.process_feed(name, &settings, &mut summary);
            }
        }

        info!(
            offers = summary.offers,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "pass complete"
        );
        Ok(summary)
    }

    fn process_feed(&mut self, name: &str, settings: &FeedSettings, summary: &mut PassSummary) {
        let offers = match self
            .feeds
            .build(name, settings)
            .and_then(|feed| feed.fetch(FEED_ITEM_LIMIT))
        {
            Ok(offers) => offers,
            Err(err) => {
                error!(feed = name, error = %err, "could not read feed");
                return;
            }
        };

        if offers.is_empty() {
            warn!(feed = name, "no items found in feed");
            return;
        }

        let now = Utc::now();
        for offer in offers {
            if !is_eligible(&offer, &self.config.ignore, now) {
                continue;
            }
            summary.offers += 1;
            self.deliver_to_all_channels(&offer, summary);
        }
    }

    /// Fans one offer out across every configured channel/endpoint pair.
    /// A failure or skip on one endpoint never blocks the others.
    fn deliver_to_all_channels(&mut self, offer: &Offer, summary: &mut PassSummary) {
        let config = self.config;
        for (channel, endpoints) in &config.notifiers {
            if !self.notifiers.is_registered(channel) {
                continue;
            }
            for endpoint in endpoints.resolved() {
                // The fingerprint covers the endpoint so each channel/endpoint
                // combination earns its own delivery record.
                let key = OfferCache::fingerprint([
                    offer.title.as_str(),
                    channel,
                    endpoint.unwrap_or_default(),
                ]);
                if self.cache.contains(&key) {
                    debug!(title = %offer.title, channel = %channel, endpoint, "already sent");
                    summary.skipped += 1;
                    continue;
                }
                if self.dry_run {
                    info!(title = %offer.title, channel = %channel, endpoint, "dry run; would deliver");
                    continue;
                }
                self.deliver(&key, channel, endpoint, offer, summary);
            }
        }
    }

    fn deliver(
        &mut self,
        key: &str,
        channel: &str,
        endpoint: Option<&str>,
        offer: &Offer,
        summary: &mut PassSummary,
    ) {
        let settings = NotifierSettings {
            endpoint: endpoint.map(ToString::to_string),
        };
        // Each delivery works on its own snapshot; the notifier stamps
        // posted_at on it and that stamped copy is what gets cached.
        let mut delivery = offer.clone();
        let sent = self
            .notifiers
            .build(channel, &settings)
            .and_then(|notifier| notifier.send(&mut delivery));

        match sent {
            Ok(true) => {
                self.cache.add(key, delivery);
                if let Err(err) = self.cache.save() {
                    warn!(error = %err, "failed to persist cache after delivery");
                }
                summary.sent += 1;
            }
            Ok(false) => {
                warn!(title = %offer.title, channel, endpoint, "send not confirmed");
                summary.failed += 1;
            }
            Err(err) => {
                error!(title = %offer.title, channel, endpoint, error = %err, "failed to send");
                summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::{App, PassSummary};
    use crate::cache::OfferCache;
    use crate::config::{Config, Endpoints};
    use crate::error::NotifyError;
    use crate::feed::{Feed, FeedRegistry};
    use crate::notify::{Notifier, NotifierRegistry};
    use crate::offer::Offer;

    #[derive(Debug)]
    struct ScriptedFeed {
        offers: Vec<Offer>,
    }

    impl Feed for ScriptedFeed {
        fn fetch(&self, count: usize) -> crate::Result<Vec<Offer>> {
            Ok(self.offers.iter().take(count).cloned().collect())
        }
    }

    #[derive(Debug)]
    struct CountingNotifier {
        sends: Arc<AtomicUsize>,
        confirm: bool,
    }

    impl Notifier for CountingNotifier {
        fn send(&self, offer: &mut Offer) -> crate::Result<bool> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.confirm {
                offer.posted_at = Some(Utc::now());
            }
            Ok(self.confirm)
        }
    }

    #[derive(Debug)]
    struct ErroringNotifier;

    impl Notifier for ErroringNotifier {
        fn send(&self, _offer: &mut Offer) -> crate::Result<bool> {
            Err(NotifyError::Validation("webhook rejected payload".to_string()))
        }
    }

    fn one_offer_feeds(title: &str) -> FeedRegistry {
        let offer = Offer::new(title, "summary", "https://example.com/a");
        let mut feeds = FeedRegistry::new();
        feeds.register("fake", move |_settings| {
            Ok(Box::new(ScriptedFeed {
                offers: vec![offer.clone()],
            }) as Box<dyn Feed>)
        });
        feeds
    }

    fn counting_notifiers(sends: &Arc<AtomicUsize>, confirm: bool) -> NotifierRegistry {
        let sends = Arc::clone(sends);
        let mut notifiers = NotifierRegistry::new();
        notifiers.register("chat", move |_settings| {
            Ok(Box::new(CountingNotifier {
                sends: Arc::clone(&sends),
                confirm,
            }) as Box<dyn Notifier>)
        });
        notifiers
    }

    fn config_with(feeds: &[&str], notifiers: &[(&str, Vec<&str>)]) -> Config {
        let mut config = Config::default();
        for name in feeds {
            config.feeds.insert((*name).to_string(), Endpoints::default());
        }
        for (name, urls) in notifiers {
            let endpoints = if urls.is_empty() {
                Endpoints::default()
            } else {
                Endpoints::from_urls(urls.iter().copied())
            };
            config.notifiers.insert((*name).to_string(), endpoints);
        }
        config
    }

    #[test]
    fn delivery_is_idempotent_within_and_across_passes() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, true);
        let config = config_with(&["fake"], &[("chat", vec!["https://hooks.example/w1"])]);
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let first = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("first pass");
        assert_eq!(first.sent, 1);
        assert_eq!(cache.len(), 1);

        let second = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("second pass");
        assert_eq!(second.sent, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn each_endpoint_gets_its_own_delivery() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, true);
        let config = config_with(
            &["fake"],
            &[("chat", vec!["https://hooks.example/w1", "https://hooks.example/w2"])],
        );
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.sent, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(sends.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregistered_channel_names_are_skipped_silently() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, true);
        let config = config_with(
            &["fake", "unknown-feed"],
            &[
                ("chat", vec!["https://hooks.example/w1"]),
                ("email", vec!["ops@example.com"]),
            ],
        );
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.sent, 1);
        assert_eq!(sends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_send_leaves_no_cache_entry_and_is_retried() {
        let feeds = one_offer_feeds("Free Game A");
        let mut notifiers = NotifierRegistry::new();
        notifiers.register("chat", |_settings| {
            Ok(Box::new(ErroringNotifier) as Box<dyn Notifier>)
        });
        let config = config_with(&["fake"], &[("chat", vec!["https://hooks.example/w1"])]);
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.failed, 1);
        assert!(cache.is_empty());

        // Nothing cached, so the next pass attempts the delivery again.
        let retry = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("retry pass");
        assert_eq!(retry.failed, 1);
        assert_eq!(retry.skipped, 0);
    }

    #[test]
    fn unconfirmed_send_counts_as_failure() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, false);
        let config = config_with(&["fake"], &[("chat", vec!["https://hooks.example/w1"])]);
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary, PassSummary { offers: 1, sent: 0, skipped: 0, failed: 1 });
        assert!(cache.is_empty());
    }

    #[test]
    fn sentinel_endpoint_delivery_is_cached() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, true);
        // Channel configured with no endpoints at all.
        let config = config_with(&["fake"], &[("chat", vec![])]);
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.sent, 1);
        assert_eq!(cache.len(), 1);

        let again = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("second pass");
        assert_eq!(again.skipped, 1);
    }

    #[test]
    fn dry_run_sends_nothing_and_caches_nothing() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Free Game A");
        let notifiers = counting_notifiers(&sends, true);
        let config = config_with(&["fake"], &[("chat", vec!["https://hooks.example/w1"])]);
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, true)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.sent, 0);
        assert_eq!(sends.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn ineligible_offers_never_reach_a_channel() {
        let sends = Arc::new(AtomicUsize::new(0));
        let feeds = one_offer_feeds("Big Fish Casino Tokens");
        let notifiers = counting_notifiers(&sends, true);
        let mut config = config_with(&["fake"], &[("chat", vec!["https://hooks.example/w1"])]);
        config.ignore.titles.push("big fish".to_string());
        let mut cache = OfferCache::open(None, 90).expect("cache");

        let summary = App::new(&config, &mut cache, &feeds, &notifiers, false)
            .run_pass()
            .expect("pass");
        assert_eq!(summary.offers, 0);
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }
}
