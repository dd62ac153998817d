//! Service wiring and lifecycle
//!
//! [`MediaService`] owns every long-lived component. Construction does no
//! background work; [`start`](MediaService::start) launches the sweep and
//! purge tasks and [`shutdown`](MediaService::shutdown) stops them again.

use crate::api::rate_limit::RateLimiter;
use crate::artifacts::ArtifactRegistry;
use crate::config::Config;
use crate::downloader::DownloadOrchestrator;
use crate::error::{Error, Result};
use crate::fetcher::{FetchBackend, Fetcher};
use crate::oauth::OAuthCoordinator;
use std::sync::Arc;
use std::time::Instant;

/// The assembled application
pub struct MediaService {
    config: Arc<Config>,
    fetcher: Arc<Fetcher>,
    registry: Arc<ArtifactRegistry>,
    orchestrator: Arc<DownloadOrchestrator>,
    rate_limiter: Arc<RateLimiter>,
    oauth: Arc<OAuthCoordinator>,
    started_at: Instant,
}

impl MediaService {
    /// Build the service, locating yt-dlp from config or PATH
    pub async fn new(config: Config) -> Result<Self> {
        let backend = Fetcher::detect_backend(&config.download);
        Self::with_backend(config, backend).await
    }

    /// Build the service around a specific fetch backend
    ///
    /// Creates the storage directory if needed.
    pub async fn with_backend(config: Config, backend: Arc<dyn FetchBackend>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.storage_dir)
            .await
            .map_err(|e| Error::Config {
                message: format!(
                    "cannot create storage directory {}: {e}",
                    config.download.storage_dir.display()
                ),
                key: Some("download.storage_dir".into()),
            })?;

        let fetcher = Arc::new(Fetcher::from_config(backend, &config.download));
        let registry = Arc::new(ArtifactRegistry::new(config.download.artifact_ttl));
        let orchestrator = Arc::new(DownloadOrchestrator::new(
            fetcher.clone(),
            registry.clone(),
            &config,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.api.rate_limit.clone()));
        let oauth = Arc::new(OAuthCoordinator::new(&config.oauth)?);

        tracing::info!(
            storage_dir = %config.download.storage_dir.display(),
            backend = fetcher.backend_name(),
            max_concurrent_fetches = config.download.max_concurrent_fetches,
            "media service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            registry,
            orchestrator,
            rate_limiter,
            oauth,
            started_at: Instant::now(),
        })
    }

    /// Launch background tasks (artifact sweep, rate limit purge)
    pub fn start(&self) {
        self.registry.start_sweeper(self.config.download.sweep_interval);
        self.rate_limiter.start_purger();
        tracing::info!(
            artifact_ttl_secs = self.config.download.artifact_ttl.as_secs(),
            sweep_interval_secs = self.config.download.sweep_interval.as_secs(),
            "background tasks started"
        );
    }

    /// Gracefully stop the service
    ///
    /// 1. Stops admitting new fetches (running ones finish or time out)
    /// 2. Stops the artifact sweeper and the rate limit purger
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.fetcher.close();
        tracing::info!(
            active_fetches = self.fetcher.active_fetches(),
            "Stopped accepting new fetches"
        );

        futures::future::join(self.registry.shutdown(), self.rate_limiter.shutdown()).await;
        tracing::info!("Background tasks stopped");

        tracing::info!("Graceful shutdown complete");
    }

    /// Configuration the service was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Download orchestrator
    pub fn downloads(&self) -> &Arc<DownloadOrchestrator> {
        &self.orchestrator
    }

    /// Artifact registry
    pub fn artifacts(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// Fetcher shared by all downloads
    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// Rate limiter applied by the HTTP layer
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// OAuth coordinator
    pub fn oauth(&self) -> &Arc<OAuthCoordinator> {
        &self.oauth
    }

    /// Time since construction
    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
