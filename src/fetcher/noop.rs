//! Fallback backend used when yt-dlp is not installed

use super::traits::{FetchBackend, FetchRequest};
use async_trait::async_trait;

const MISSING_BINARY: &str = "yt-dlp is not installed. \
     Set download.ytdlp_path in config or ensure yt-dlp is in PATH.";

/// Backend that fails every operation with [`crate::Error::ExternalTool`]
///
/// Lets the server start without yt-dlp so that the health endpoint can
/// report the problem instead of the process refusing to boot.
pub struct UnavailableBackend;

#[async_trait]
impl FetchBackend for UnavailableBackend {
    async fn fetch(&self, _request: &FetchRequest) -> crate::Result<()> {
        Err(crate::Error::ExternalTool(MISSING_BINARY.into()))
    }

    async fn probe(&self, _url: &str) -> crate::Result<serde_json::Value> {
        Err(crate::Error::ExternalTool(MISSING_BINARY.into()))
    }

    async fn version(&self) -> crate::Result<String> {
        Err(crate::Error::ExternalTool(MISSING_BINARY.into()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
