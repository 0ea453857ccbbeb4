use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use freegame_core::app::App;
use freegame_core::cache::OfferCache;
use freegame_core::config::Config;
use freegame_core::feed::FeedRegistry;
use freegame_core::notify::NotifierRegistry;

#[derive(Debug, Parser)]
#[command(name = "freegame")]
#[command(about = "Poll free-game feeds and deliver new offers to notification channels", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "FREEGAME_CONFIG")]
    config: PathBuf,

    /// Log at debug level regardless of configuration.
    #[arg(long, env = "FREEGAME_DEBUG", default_value_t = false)]
    debug: bool,

    /// Compute deliveries but send nothing and cache nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    init_logging(cli.debug || config.debug);
    debug!(path = %cli.config.display(), "loaded configuration");

    let mut cache = OfferCache::open(config.cache_path.as_deref(), config.cache_age)
        .context("failed to open offer cache")?;
    cache.invalidate(None);

    let feeds = FeedRegistry::builtin();
    let notifiers = NotifierRegistry::builtin();

    let summary = App::new(&config, &mut cache, &feeds, &notifiers, cli.dry_run)
        .run_pass()
        .context("polling pass failed")?;

    println!(
        "offers: {} sent: {} skipped: {} failed: {}",
        summary.offers, summary.sent, summary.skipped, summary.failed
    );
    Ok(())
}
