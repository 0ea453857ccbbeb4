pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod icons;
pub mod notify;
pub mod offer;

pub use app::{App, PassSummary};
pub use cache::OfferCache;
pub use config::Config;
pub use error::{NotifyError, Result};
pub use offer::Offer;
