//! Typed application configuration, loaded once from a YAML file and passed
//! by reference into the orchestrator and collaborators.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;

use crate::cache::DEFAULT_MAX_AGE_DAYS;
use crate::error::{NotifyError, Result};
use crate::filter::IgnoreRules;

/// Endpoint list for one feed or notifier name.
///
/// YAML allows `slack:` (null), `slack: [-]` (one null entry) and a plain
/// list of strings. [`Endpoints::resolved`] normalizes all of those: a
/// missing or empty list degrades to the single no-endpoint sentinel, which
/// keeps the channel inspectable without a live destination.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Endpoints(Option<Vec<Option<String>>>);

impl Endpoints {
    /// Explicit endpoint list, for programmatic configuration.
    #[must_use]
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Some(urls.into_iter().map(|url| Some(url.into())).collect()))
    }

    pub fn resolved(&self) -> Vec<Option<&str>> {
        let entries: Vec<Option<&str>> = match &self.0 {
            None => Vec::new(),
            Some(list) => list
                .iter()
                .map(|entry| {
                    entry
                        .as_deref()
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                })
                .collect(),
        };
        if entries.is_empty() {
            vec![None]
        } else {
            entries
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed-offset timezone identifier: "UTC", "Z" or "+HH:MM" / "-HH:MM".
    pub timezone: String,
    pub feeds: BTreeMap<String, Endpoints>,
    pub notifiers: BTreeMap<String, Endpoints>,
    pub ignore: IgnoreRules,
    pub cache_path: Option<PathBuf>,
    /// Eviction threshold for the dedup cache, in days. Zero disables
    /// age-based eviction.
    pub cache_age: i64,
    /// Feed items published before this date are dropped.
    pub start_date: Option<NaiveDate>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            feeds: BTreeMap::new(),
            notifiers: BTreeMap::new(),
            ignore: IgnoreRules::default(),
            cache_path: None,
            cache_age: DEFAULT_MAX_AGE_DAYS,
            start_date: None,
            debug: false,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_norway::from_str(raw)?;
        config.utc_offset()?;
        Ok(config)
    }

    /// Parses the configured timezone identifier.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.timezone)
    }
}

fn parse_utc_offset(identifier: &str) -> Result<FixedOffset> {
    let identifier = identifier.trim();
    if identifier.is_empty() || identifier.eq_ignore_ascii_case("utc") || identifier == "Z" {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match identifier.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => {
            return Err(NotifyError::Config(format!(
                "unsupported timezone identifier: {identifier}"
            )));
        }
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(|| {
        NotifyError::Config(format!("unsupported timezone identifier: {identifier}"))
    })?;
    let hours: i32 = hours
        .parse()
        .map_err(|_| NotifyError::Config(format!("invalid timezone hours: {identifier}")))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| NotifyError::Config(format!("invalid timezone minutes: {identifier}")))?;
    if hours > 23 || minutes > 59 {
        return Err(NotifyError::Config(format!(
            "timezone offset out of range: {identifier}"
        )));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| {
        NotifyError::Config(format!("timezone offset out of range: {identifier}"))
    })
}
