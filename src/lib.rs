//! # mediagrab
//!
//! HTTP service that downloads public social media through yt-dlp and hands
//! the result back as a short-lived file.
//!
//! ## Components
//!
//! - [`fetcher::Fetcher`] - runs the fetch backend (yt-dlp) with bounded
//!   concurrency and a per-fetch timeout
//! - [`artifacts::ArtifactRegistry`] - tracks produced files and sweeps them
//!   after their TTL
//! - [`downloader::DownloadOrchestrator`] - classifies URLs, fetches,
//!   validates output and registers artifacts
//! - [`api::rate_limit::RateLimiter`] - fixed-window per-client limits
//! - [`oauth::OAuthCoordinator`] - authorize URLs and code exchange for
//!   Instagram, YouTube, TikTok and Twitter
//!
//! ## Quick Start
//!
//! ```no_run
//! use mediagrab::{Config, MediaService, MediaKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = MediaService::new(Config::default()).await?;
//!     service.start();
//!
//!     let result = service
//!         .downloads()
//!         .download("https://www.youtube.com/watch?v=dQw4w9WgXcQ", MediaKind::Video)
//!         .await?;
//!     println!("saved {} ({})", result.filename, result.title);
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use std::sync::Arc;

/// REST API module
pub mod api;
/// Artifact registry with TTL sweeping
pub mod artifacts;
/// Configuration types
pub mod config;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// yt-dlp subprocess fetcher
pub mod fetcher;
/// Platform OAuth coordination
pub mod oauth;
/// URL classification and format selection
pub mod platform;
/// Secret redaction for logs and error bodies
pub mod redact;
/// Service wiring and lifecycle
pub mod service;
/// Core API types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use artifacts::{Artifact, ArtifactId, ArtifactRegistry};
pub use config::Config;
pub use downloader::DownloadOrchestrator;
pub use error::{ApiError, DownloadError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{FetchBackend, FetchRequest, FetchResult, Fetcher, UnavailableBackend, YtDlpBackend};
pub use oauth::{ConnectedPlatform, OAuthCoordinator};
pub use platform::{MediaKind, MediaPlatform};
pub use service::MediaService;
pub use types::{DownloadResult, MediaFormat, MediaInfo, MediaMetadata};

/// Helper function to run the service with graceful signal handling.
///
/// Starts the background tasks, serves the API until a termination signal
/// arrives, then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use mediagrab::{Config, MediaService, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = Arc::new(MediaService::new(Config::default()).await?);
///
///     // Run with automatic signal handling
///     run_with_shutdown(service).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: Arc<MediaService>) -> Result<()> {
    service.start();
    let served = api::start_api_server(service.clone(), wait_for_signal()).await;
    service.shutdown().await;
    served
}

/// Resolve when the process is asked to stop
///
/// On Unix this is SIGTERM or SIGINT. If a handler cannot be registered
/// (restricted containers), falls back to `ctrl_c()`.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT signal"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
