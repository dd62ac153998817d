//! Traits and types for media fetch backends

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A single fetch job handed to a backend
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Page or media URL to fetch
    pub source_url: String,
    /// yt-dlp format selector (see [`crate::platform::format_selector`])
    pub format_selector: String,
    /// Where the media file must be written
    pub output_path: PathBuf,
    /// Ask the tool to write a `.info.json` metadata sidecar
    pub write_info_json: bool,
    /// Container to merge split streams into, when the selector may merge
    pub merge_container: Option<String>,
}

/// Verified output of a successful fetch
#[must_use]
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Path of the media file
    pub path: PathBuf,
    /// Size of the media file in bytes
    pub size_bytes: u64,
    /// Metadata sidecar, when the tool produced one
    pub info_json: Option<PathBuf>,
}

/// Trait for media fetch backends
///
/// A backend only runs the transfer. Concurrency limits, deadlines and
/// output verification are applied by [`super::Fetcher`] around it, so a
/// stub backend in tests gets the same treatment as the real subprocess.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Download `request.source_url` into `request.output_path`
    ///
    /// Returning `Ok` only means the backend finished without reporting an
    /// error; the caller still checks the output file.
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<()>;

    /// Dump the tool's metadata for a URL without downloading media
    async fn probe(&self, url: &str) -> crate::Result<serde_json::Value>;

    /// Report the backend version, used by the health endpoint
    async fn version(&self) -> crate::Result<String>;

    /// Get the name of this backend implementation
    fn name(&self) -> &'static str;
}

/// Paths where a metadata sidecar for `output` may appear
///
/// yt-dlp replaces the media extension (`clip.info.json`); some builds and
/// wrappers append to the full name (`clip.mp4.info.json`).
pub fn sidecar_candidates(output: &Path) -> [PathBuf; 2] {
    let replaced = output.with_extension("info.json");
    let mut appended = output.as_os_str().to_owned();
    appended.push(".info.json");
    [replaced, PathBuf::from(appended)]
}
