//! Download orchestration
//!
//! [`DownloadOrchestrator`] turns a URL into a registered artifact:
//!
//! 1. classify the URL by platform
//! 2. derive the artifact file name and the yt-dlp format selector
//! 3. run the [`Fetcher`], removing partial output on any failure
//! 4. read (then delete) the metadata sidecar, falling back to defaults
//! 5. register the artifact for timed deletion
//!
//! Identical URLs are not deduplicated; every call produces its own artifact.

mod cleanup;
mod metadata;

use crate::artifacts::{Artifact, ArtifactRegistry, NewArtifact};
use crate::config::Config;
use crate::error::{DownloadError, Error, Result};
use crate::fetcher::{FetchRequest, Fetcher};
use crate::platform::{self, MediaKind, MediaPlatform};
use crate::types::{DownloadResult, MediaInfo};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

const PROBE_FAILED: &str =
    "Could not get video information. The video might be private or restricted.";

/// Drives fetches and owns the path from URL to registered artifact
pub struct DownloadOrchestrator {
    fetcher: Arc<Fetcher>,
    registry: Arc<ArtifactRegistry>,
    storage_dir: PathBuf,
    artifact_prefix: String,
    max_height: u32,
    block_private_hosts: bool,
    /// Last timestamp handed out, keeps file names unique under concurrency
    last_timestamp: AtomicI64,
}

impl DownloadOrchestrator {
    /// Create an orchestrator writing into `config.download.storage_dir`
    pub fn new(fetcher: Arc<Fetcher>, registry: Arc<ArtifactRegistry>, config: &Config) -> Self {
        Self {
            fetcher,
            registry,
            storage_dir: config.download.storage_dir.clone(),
            artifact_prefix: config.api.artifact_prefix.clone(),
            max_height: config.download.max_height,
            block_private_hosts: config.download.block_private_hosts,
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// Download `url` as `kind` and register the result
    ///
    /// Fails with [`Error::Validation`] for an empty or blocked URL,
    /// [`Error::UnsupportedPlatform`] when no platform matches, and
    /// [`DownloadError::Failed`] when the fetch does not produce a usable
    /// file. In the failure case no artifact is registered and no file is
    /// left behind.
    pub async fn download(&self, url: &str, kind: MediaKind) -> Result<DownloadResult> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::Validation("URL cannot be empty".into()));
        }
        if self.block_private_hosts {
            platform::ensure_public_host(url)?;
        }
        let platform = platform::classify(url)?;

        let filename = self.next_filename(platform, kind);
        let output_path = self.storage_dir.join(&filename);
        let request = FetchRequest {
            source_url: url.to_string(),
            format_selector: platform::format_selector(platform, kind, self.max_height),
            output_path: output_path.clone(),
            write_info_json: true,
            merge_container: (kind == MediaKind::Video && platform.is_primary())
                .then(|| kind.extension().to_string()),
        };

        tracing::info!(
            platform = %platform,
            kind = ?kind,
            filename = %filename,
            "starting download"
        );

        let fetched = match self.fetcher.fetch(&request).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(
                    platform = %platform,
                    filename = %filename,
                    error = %e,
                    "download failed, removing partial output"
                );
                cleanup::remove_partial_output(&output_path).await;
                return Err(DownloadError::Failed {
                    platform: platform.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let meta = metadata::read_sidecar(fetched.info_json.as_deref(), platform).await;
        cleanup::remove_sidecars(&output_path).await;

        let artifact_id = self
            .registry
            .register(NewArtifact {
                file_path: fetched.path,
                filename: filename.clone(),
                platform,
            })
            .await;

        tracing::info!(
            platform = %platform,
            filename = %filename,
            artifact_id = %artifact_id,
            size_bytes = fetched.size_bytes,
            "download completed"
        );

        Ok(DownloadResult {
            success: true,
            retrieval_path: format!("{}/{}", self.artifact_prefix, filename),
            filename,
            title: meta.title,
            thumbnail: meta.thumbnail,
            channel: meta.channel,
            hashtags: meta.hashtags,
            length: meta.length,
            age_restriction: meta.age_restriction,
        })
    }

    /// Metadata preview for a URL without downloading it
    ///
    /// Only the primary platform is probed; the others get placeholders
    /// because their metadata is only available once the media is fetched.
    pub async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::Validation("URL is required".into()));
        }
        if self.block_private_hosts {
            platform::ensure_public_host(url)?;
        }
        let platform = platform::classify(url)?;
        if !platform.is_primary() {
            return Ok(MediaInfo::placeholder(platform));
        }

        let info = self.fetcher.probe(url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "metadata probe failed");
            Error::from(DownloadError::Failed {
                platform: platform.to_string(),
                reason: PROBE_FAILED.into(),
            })
        })?;
        Ok(MediaInfo::from_probe(&info))
    }

    /// Find the live artifact behind a public file name
    ///
    /// Names with path components are rejected. Unregistered or expired
    /// names, and entries whose file has vanished, are reported as not found.
    pub async fn resolve_artifact(&self, filename: &str) -> Result<Artifact> {
        if !is_plain_file_name(filename) {
            return Err(Error::Validation("Invalid file name".into()));
        }

        let artifact = self
            .registry
            .find_by_filename(filename)
            .await
            .ok_or_else(|| Error::NotFound(format!("artifact {filename}")))?;

        if !tokio::fs::try_exists(&artifact.file_path)
            .await
            .unwrap_or(false)
        {
            return Err(Error::NotFound(format!("artifact {filename}")));
        }
        Ok(artifact)
    }

    /// Directory artifacts are written to
    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    /// The fetcher used for downloads
    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    // <platform>_<ms timestamp>.<ext>, strictly increasing per orchestrator
    fn next_filename(&self, platform: MediaPlatform, kind: MediaKind) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let timestamp = now.max(previous + 1);
        format!("{}_{}.{}", platform.as_str(), timestamp, kind.extension())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}
