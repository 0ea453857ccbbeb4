//! Notification channels: deliver one offer to one endpoint.

use std::collections::BTreeMap;

use crate::error::{NotifyError, Result};
use crate::offer::Offer;

pub mod slack;

pub use slack::SlackNotifier;

/// One outbound delivery attempt. Returns `Ok(true)` only when the send is
/// confirmed; a confirmed send stamps `offer.posted_at`, which the
/// orchestrator then persists in the cache snapshot.
pub trait Notifier: std::fmt::Debug {
    fn send(&self, offer: &mut Offer) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct NotifierSettings {
    /// Concrete destination. `None` is the no-endpoint sentinel: the channel
    /// "delivers" by logging, and that delivery is still cached.
    pub endpoint: Option<String>,
}

type NotifierCtor = Box<dyn Fn(&NotifierSettings) -> Result<Box<dyn Notifier>>>;

/// Typed name-to-constructor mapping for channel types.
#[derive(Default)]
pub struct NotifierRegistry {
    ctors: BTreeMap<String, NotifierCtor>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every channel type this crate ships.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("slack", |settings| {
            Ok(Box::new(SlackNotifier::new(settings)?) as Box<dyn Notifier>)
        });
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn(&NotifierSettings) -> Result<Box<dyn Notifier>> + 'static,
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

    pub fn build(&self, name: &str, settings: &NotifierSettings) -> Result<Box<dyn Notifier>> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| NotifyError::UnknownName(name.to_string()))?;
        ctor(settings)
    }
}

impl std::fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("names", &self.ctors.keys().collect::<Vec<_>>())
            .finish()
    }
}
