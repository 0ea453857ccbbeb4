//! Content-addressed record of deliveries that already happened.
//!
//! The cache maps a delivery fingerprint — blake3 over
//! `(title, channel, endpoint)` — to the offer snapshot that was delivered.
//! It is a single flat JSON file rewritten wholesale on save: eviction by age
//! is a filter-and-rewrite, and cache sizes stay in the tens to low hundreds
//! of entries, so write amplification is not a concern. The write is not an
//! atomic rename; the file is owned by one process at a time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::offer::Offer;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 90;

#[derive(Debug)]
pub struct OfferCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Offer>,
    max_age_days: i64,
}

impl OfferCache {
    /// Loads the cache from `path`. A missing or empty file yields an empty
    /// mapping; `None` runs the cache in memory only (saves become no-ops).
    pub fn open(path: Option<&Path>, max_age_days: i64) -> Result<Self> {
        let entries = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                if raw.trim().is_empty() {
                    BTreeMap::new()
                } else {
                    serde_json::from_str(&raw)?
                }
            }
            _ => BTreeMap::new(),
        };

        Ok(Self {
            path: path.map(Path::to_path_buf),
            entries,
            max_age_days,
        })
    }

    /// Deterministic, order-sensitive delivery fingerprint. Writers and
    /// readers must feed parts in the same order: title, channel, endpoint.
    #[must_use]
    pub fn fingerprint<I, S>(parts: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part.as_ref().as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<&Offer> {
        self.entries.get(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or overwrites a delivery record. Does not persist by itself;
    /// callers pair this with [`OfferCache::save`] once the send is confirmed.
    pub fn add(&mut self, fingerprint: impl Into<String>, snapshot: Offer) {
        self.entries.insert(fingerprint.into(), snapshot);
    }

    /// Serializes the full mapping to disk, replacing prior contents.
    ///
    /// With no configured path this is a recoverable no-op (ad-hoc and
    /// dry-run use), logged as a warning rather than raised.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            warn!("cache save requested without a configured path");
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(&self.entries)?)?;
        Ok(())
    }

    /// Removes entries whose `posted_at` is older than `now - days`, where
    /// `days` defaults to the configured maximum age. Entries without a
    /// `posted_at` are never evicted: they represent deliveries that were
    /// never confirmed and must not be dropped silently. Persists only when
    /// at least one entry was removed. Returns the number removed.
    pub fn invalidate(&mut self, days: Option<i64>) -> usize {
        let days = days.unwrap_or(self.max_age_days);
        if days <= 0 {
            return 0;
        }

        let cutoff = Utc::now() - Duration::days(days);
        let removed = self.evict_posted_before(cutoff);

        if removed > 0 {
            debug!(removed, days, "evicted cache entries older than cutoff");
            if let Err(err) = self.save() {
                warn!(error = %err, "failed to persist cache after eviction");
            }
        }
        removed
    }

    fn evict_posted_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let keep = match entry.posted_at {
                Some(posted_at) => posted_at >= cutoff,
                None => true,
            };
            if !keep {
                debug!(key = %key, title = %entry.title, "invalidating cache entry");
            }
            keep
        });
        before - self.entries.len()
    }
}
