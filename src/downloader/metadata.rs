//! Mapping yt-dlp JSON into result metadata

use crate::platform::MediaPlatform;
use crate::types::{MediaFormat, MediaInfo, MediaMetadata};
use serde_json::Value;
use std::path::Path;

impl MediaMetadata {
    /// Defaults used when no sidecar could be read
    pub fn placeholder(platform: MediaPlatform) -> Self {
        Self {
            title: format!("{} content", platform.as_str()),
            ..Self::default()
        }
    }

    /// Extract metadata from a yt-dlp info JSON document
    ///
    /// Missing or mistyped fields fall back to the placeholder values.
    pub fn from_info_json(info: &Value, platform: MediaPlatform) -> Self {
        let fallback = Self::placeholder(platform);
        Self {
            title: non_empty_str(info, "title").unwrap_or(fallback.title),
            thumbnail: non_empty_str(info, "thumbnail").unwrap_or_default(),
            channel: non_empty_str(info, "uploader")
                .or_else(|| non_empty_str(info, "channel"))
                .unwrap_or_default(),
            hashtags: info
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            length: non_empty_str(info, "duration_string").unwrap_or_default(),
            age_restriction: info
                .get("age_limit")
                .and_then(Value::as_f64)
                .is_some_and(|limit| limit > 0.0),
        }
    }
}

/// Read a sidecar file, falling back to placeholders on any problem
pub(crate) async fn read_sidecar(path: Option<&Path>, platform: MediaPlatform) -> MediaMetadata {
    let Some(path) = path else {
        tracing::debug!(platform = %platform, "no metadata sidecar, using defaults");
        return MediaMetadata::placeholder(platform);
    };

    let parsed = match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match parsed {
        Ok(info) => MediaMetadata::from_info_json(&info, platform),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read metadata sidecar");
            MediaMetadata::placeholder(platform)
        }
    }
}

impl MediaInfo {
    /// Map a `--dump-json` document into the info response
    pub fn from_probe(info: &Value) -> Self {
        let duration = non_empty_str(info, "duration_string")
            .or_else(|| info.get("duration").and_then(Value::as_f64).map(|d| d.to_string()))
            .unwrap_or_default();

        Self {
            success: true,
            title: non_empty_str(info, "title").unwrap_or_default(),
            duration,
            thumbnail: non_empty_str(info, "thumbnail").unwrap_or_default(),
            author: non_empty_str(info, "uploader").unwrap_or_default(),
            formats: info
                .get("formats")
                .and_then(Value::as_array)
                .map(|formats| formats.iter().map(MediaFormat::from_probe).collect())
                .unwrap_or_default(),
        }
    }

    /// Provisional info for platforms whose metadata is only resolved at download time
    pub fn placeholder(platform: MediaPlatform) -> Self {
        Self {
            success: true,
            title: format!("{} Post", platform.display_name()),
            duration: "N/A".into(),
            thumbnail: String::new(),
            author: format!("{} User", platform.display_name()),
            formats: Vec::new(),
        }
    }
}

impl MediaFormat {
    fn from_probe(format: &Value) -> Self {
        let ext = non_empty_str(format, "ext").unwrap_or_default();
        let quality = non_empty_str(format, "format_note")
            .or_else(|| {
                format
                    .get("height")
                    .and_then(Value::as_u64)
                    .map(|h| format!("{h}p"))
            })
            .unwrap_or_else(|| "unknown".into());

        Self {
            format_id: non_empty_str(format, "format_id").unwrap_or_default(),
            quality,
            mime_type: ext.clone(),
            container: ext,
            has_audio: stream_present(format, "acodec"),
            has_video: stream_present(format, "vcodec"),
            content_length: format
                .get("filesize")
                .and_then(Value::as_u64)
                .or_else(|| format.get("filesize_approx").and_then(Value::as_u64)),
        }
    }
}

// yt-dlp reports "none" for a missing stream; an absent field means unknown
fn stream_present(format: &Value, key: &str) -> bool {
    format
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|codec| codec != "none")
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
