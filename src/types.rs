//! Core types returned by mediagrab operations

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a successful download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    /// Always true
    pub success: bool,
    /// Path the file can be retrieved from, e.g. `/temp/youtube_1714560000000.mp4`
    pub retrieval_path: String,
    /// Artifact file name
    pub filename: String,
    /// Title from the source, or a platform placeholder
    pub title: String,
    /// Thumbnail URL, empty when unknown
    pub thumbnail: String,
    /// Uploader or channel name, empty when unknown
    pub channel: String,
    /// Tags attached to the source
    pub hashtags: Vec<String>,
    /// Human-readable duration (e.g. "3:32"), empty when unknown
    pub length: String,
    /// Whether the source is age restricted
    pub age_restriction: bool,
}

/// Descriptive metadata for downloaded media
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Uploader or channel
    pub channel: String,
    /// Tags
    pub hashtags: Vec<String>,
    /// Duration string
    pub length: String,
    /// Age restricted
    pub age_restriction: bool,
}

/// Metadata preview for a URL, returned by the info probe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Always true
    pub success: bool,
    /// Title
    pub title: String,
    /// Duration; "N/A" when only known at download time
    pub duration: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Uploader
    pub author: String,
    /// Available formats (empty for platforms resolved at download time)
    pub formats: Vec<MediaFormat>,
}

/// One format offered by the source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    /// yt-dlp format id
    pub format_id: String,
    /// Quality label (format note or height)
    pub quality: String,
    /// File extension reported by the source
    pub mime_type: String,
    /// Container extension
    pub container: String,
    /// Format carries an audio stream
    pub has_audio: bool,
    /// Format carries a video stream
    pub has_video: bool,
    /// Size in bytes, when known
    pub content_length: Option<u64>,
}
