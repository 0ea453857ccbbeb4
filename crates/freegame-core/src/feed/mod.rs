//! Feed collaborators: turn a configured endpoint into normalized offers.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};

use crate::error::{NotifyError, Result};
use crate::offer::Offer;

mod rss;
pub mod steam;

pub use steam::SteamFeed;

/// One-shot retrieval of up to `count` offers from a feed endpoint. The feed
/// owns network access and raw-record extraction; the core only consumes
/// constructed [`Offer`] values.
pub trait Feed: std::fmt::Debug {
    fn fetch(&self, count: usize) -> Result<Vec<Offer>>;
}

/// Per-endpoint construction inputs shared by every feed type.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Endpoint URL; `None` lets the feed fall back to its default.
    pub url: Option<String>,
    /// Items published before this date are dropped at the feed boundary.
    pub start_date: Option<NaiveDate>,
    /// Timezone for rendering feed-local dates.
    pub timezone: FixedOffset,
}

type FeedCtor = Box<dyn Fn(&FeedSettings) -> Result<Box<dyn Feed>>>;

/// Typed name-to-constructor mapping for feed types. Only names present in
/// both the registry and the configuration are processed during a pass.
#[derive(Default)]
pub struct FeedRegistry {
    ctors: BTreeMap<String, FeedCtor>,
}

impl FeedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every feed type this crate ships.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("steam", |settings| {
            Ok(Box::new(SteamFeed::new(settings)?) as Box<dyn Feed>)
        });
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn(&FeedSettings) -> Result<Box<dyn Feed>> + 'static,
    ) {
        self.ctors.insert(name.into(), Box::new(ctor));
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }

    pub fn build(&self, name: &str, settings: &FeedSettings) -> Result<Box<dyn Feed>> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| NotifyError::UnknownName(name.to_string()))?;
        ctor(settings)
    }
}

impl std::fmt::Debug for FeedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRegistry")
            .field("names", &self.ctors.keys().collect::<Vec<_>>())
            .finish()
    }
}
