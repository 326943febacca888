//! Shared startup for the docqa binaries.

use docqa_core::config::{Config, Settings};
use tracing_subscriber::EnvFilter;

/// Load `.env`, install the log subscriber and read settings from the working directory.
pub fn init() -> anyhow::Result<Settings> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    Ok(config.settings()?)
}
