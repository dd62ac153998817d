//! Media fetching through an external tool
//!
//! The [`FetchBackend`] trait is the narrow seam around the subprocess.
//! [`Fetcher`] wraps any backend with the policies every fetch must obey:
//!
//! - at most `max_concurrent_fetches` transfers run at once (semaphore)
//! - each transfer has a deadline; on expiry the backend future is dropped,
//!   which kills the yt-dlp child
//! - the output must exist and reach `min_file_size` bytes, even when the
//!   tool reported success
//!
//! Implementations:
//!
//! - [`YtDlpBackend`]: runs the `yt-dlp` binary
//! - [`UnavailableBackend`]: stub used when yt-dlp is missing

mod cli;
mod noop;
mod traits;

pub use cli::YtDlpBackend;
pub use noop::UnavailableBackend;
pub use traits::{FetchBackend, FetchRequest, FetchResult, sidecar_candidates};

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Bounded, deadline-enforcing wrapper around a [`FetchBackend`]
pub struct Fetcher {
    backend: Arc<dyn FetchBackend>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Duration,
    min_file_size: u64,
}

impl Fetcher {
    /// Create a fetcher with explicit limits
    pub fn new(
        backend: Arc<dyn FetchBackend>,
        max_concurrent: usize,
        timeout: Duration,
        min_file_size: u64,
    ) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout,
            min_file_size,
        }
    }

    /// Create a fetcher using the limits from the download configuration
    pub fn from_config(backend: Arc<dyn FetchBackend>, config: &DownloadConfig) -> Self {
        Self::new(
            backend,
            config.max_concurrent_fetches,
            config.fetch_timeout,
            config.min_file_size,
        )
    }

    /// Pick the yt-dlp backend from config or PATH, falling back to
    /// [`UnavailableBackend`] when no binary can be found
    pub fn detect_backend(config: &DownloadConfig) -> Arc<dyn FetchBackend> {
        if let Some(path) = &config.ytdlp_path {
            return Arc::new(YtDlpBackend::new(path.clone()));
        }
        match YtDlpBackend::from_path() {
            Some(backend) => {
                tracing::info!(path = %backend.binary_path().display(), "using yt-dlp");
                Arc::new(backend)
            }
            None => {
                tracing::warn!("yt-dlp not found in PATH, downloads will fail until it is installed");
                Arc::new(UnavailableBackend)
            }
        }
    }

    /// Run a fetch and verify its output
    ///
    /// Waits for a free slot first. Partial output left behind on error is
    /// the caller's to remove.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Other("fetcher is shut down".into()))?;

        match tokio::time::timeout(self.timeout, self.backend.fetch(request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    url = %request.source_url,
                    timeout_secs = self.timeout.as_secs(),
                    "fetch deadline exceeded, subprocess killed"
                );
                return Err(DownloadError::TimedOut {
                    timeout_secs: self.timeout.as_secs(),
                }
                .into());
            }
        }

        let size_bytes = verify_output(&request.output_path, self.min_file_size).await?;
        let info_json = first_existing(&sidecar_candidates(&request.output_path)).await;

        Ok(FetchResult {
            path: request.output_path.clone(),
            size_bytes,
            info_json,
        })
    }

    /// Dump metadata for a URL, under the same slot and deadline rules
    pub async fn probe(&self, url: &str) -> Result<serde_json::Value> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Other("fetcher is shut down".into()))?;

        tokio::time::timeout(self.timeout, self.backend.probe(url))
            .await
            .map_err(|_| {
                Error::from(DownloadError::TimedOut {
                    timeout_secs: self.timeout.as_secs(),
                })
            })?
    }

    /// Version string of the backend tool
    pub async fn backend_version(&self) -> Result<String> {
        self.backend.version().await
    }

    /// Name of the backend implementation
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of fetches currently running
    pub fn active_fetches(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.permits.available_permits())
    }

    /// Stop admitting new fetches; waiters fail immediately
    pub fn close(&self) {
        self.permits.close();
    }
}

async fn verify_output(path: &Path, min_file_size: u64) -> Result<u64> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DownloadError::Incomplete {
                path: path.to_path_buf(),
                reason: "output file was not created".into(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.len() < min_file_size {
        return Err(DownloadError::Incomplete {
            path: path.to_path_buf(),
            reason: format!(
                "file is {} bytes, expected at least {}",
                metadata.len(),
                min_file_size
            ),
        }
        .into());
    }
    Ok(metadata.len())
}

async fn first_existing(candidates: &[std::path::PathBuf]) -> Option<std::path::PathBuf> {
    for candidate in candidates {
        if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
            return Some(candidate.clone());
        }
    }
    None
}
