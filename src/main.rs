//! mediagrab server binary
//!
//! Loads configuration from `config/mediagrab.toml` (or `$MEDIAGRAB_CONFIG`)
//! and the environment, then serves the API until SIGTERM/SIGINT.

use mediagrab::{MediaService, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = mediagrab::config::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.api.bind_address,
        storage_dir = %config.download.storage_dir.display(),
        "starting mediagrab"
    );

    let service = Arc::new(MediaService::new(config).await?);
    run_with_shutdown(service).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
