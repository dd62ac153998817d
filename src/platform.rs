//! Media platform classification and format-selection policy
//!
//! URLs are matched on their host against a fixed pattern table. The
//! resolved [`MediaPlatform`] decides the yt-dlp format selector and the
//! artifact file name.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use url::{Host, Url};
use utoipa::ToSchema;

/// A platform media can be downloaded from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaPlatform {
    /// Long-form video host with separate video/audio streams
    YouTube,
    /// Instagram posts and reels
    Instagram,
    /// Twitter / X posts
    Twitter,
}

/// Host suffixes that identify each platform
///
/// A URL matches when its host equals a listed domain or is a subdomain of it.
const PLATFORM_PATTERNS: &[(MediaPlatform, &[&str])] = &[
    (MediaPlatform::YouTube, &["youtube.com", "youtu.be"]),
    (MediaPlatform::Instagram, &["instagram.com"]),
    (MediaPlatform::Twitter, &["twitter.com", "x.com"]),
];

impl MediaPlatform {
    /// Lowercase identifier used in file names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaPlatform::YouTube => "youtube",
            MediaPlatform::Instagram => "instagram",
            MediaPlatform::Twitter => "twitter",
        }
    }

    /// Whether this is the primary platform, which serves split
    /// video/audio streams that must be merged
    pub fn is_primary(&self) -> bool {
        matches!(self, MediaPlatform::YouTube)
    }

    /// Human-readable name for placeholder metadata
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaPlatform::YouTube => "YouTube",
            MediaPlatform::Instagram => "Instagram",
            MediaPlatform::Twitter => "Twitter",
        }
    }
}

impl fmt::Display for MediaPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the client wants out of the source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video with audio, stored as mp4
    Video,
    /// Audio only, stored as m4a
    Audio,
}

impl MediaKind {
    /// Container extension for the artifact
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "m4a",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            _ => Err(Error::Validation(
                "Type must be either \"video\" or \"audio\"".into(),
            )),
        }
    }
}

/// Resolve the platform a URL belongs to
///
/// Unparsable URLs and hosts outside the pattern table are both reported as
/// [`Error::UnsupportedPlatform`].
pub fn classify(url: &str) -> Result<MediaPlatform> {
    let host = Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .ok_or_else(|| Error::UnsupportedPlatform(url.to_string()))?;

    PLATFORM_PATTERNS
        .iter()
        .find(|(_, domains)| domains.iter().any(|d| host_matches(&host, d)))
        .map(|(platform, _)| *platform)
        .ok_or_else(|| Error::UnsupportedPlatform(url.to_string()))
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// yt-dlp format selector for a platform and media kind
///
/// `max_height` caps the video resolution; audio ignores it.
pub fn format_selector(platform: MediaPlatform, kind: MediaKind, max_height: u32) -> String {
    match kind {
        MediaKind::Audio => "bestaudio[ext=m4a]/bestaudio/best".to_string(),
        MediaKind::Video if platform.is_primary() => format!(
            "bestvideo[height<={max_height}][ext=mp4]+bestaudio[ext=m4a]/best[height<={max_height}][ext=mp4]/best"
        ),
        MediaKind::Video => format!("best[height<={max_height}][ext=mp4]/best[ext=mp4]/best"),
    }
}

/// Reject URLs whose host is a loopback, private or link-local address
pub fn ensure_public_host(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url.trim()).map_err(|_| Error::Validation("Invalid URL format".into()))?;

    let blocked = match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
        None => return Err(Error::Validation("Invalid hostname in URL".into())),
    };

    if blocked {
        return Err(Error::Validation(
            "Access to local/private URLs is not allowed".into(),
        ));
    }
    Ok(())
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_supported_host() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", MediaPlatform::YouTube),
            ("https://youtube.com/shorts/abc", MediaPlatform::YouTube),
            ("https://m.youtube.com/watch?v=abc", MediaPlatform::YouTube),
            ("https://youtu.be/dQw4w9WgXcQ", MediaPlatform::YouTube),
            ("https://www.instagram.com/p/Cxyz/", MediaPlatform::Instagram),
            ("https://instagram.com/reel/abc", MediaPlatform::Instagram),
            ("https://twitter.com/user/status/1", MediaPlatform::Twitter),
            ("https://x.com/user/status/1", MediaPlatform::Twitter),
            ("https://mobile.twitter.com/user/status/1", MediaPlatform::Twitter),
        ];

        for (url, expected) in cases {
            assert_eq!(classify(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn each_pattern_belongs_to_exactly_one_platform() {
        for (platform, domains) in PLATFORM_PATTERNS {
            for domain in *domains {
                let url = format!("https://{domain}/path");
                let matches: Vec<_> = PLATFORM_PATTERNS
                    .iter()
                    .filter(|(_, ds)| ds.iter().any(|d| host_matches(domain, d)))
                    .collect();
                assert_eq!(matches.len(), 1, "{domain} matched more than one platform");
                assert_eq!(classify(&url).unwrap(), *platform);
            }
        }
    }

    #[test]
    fn rejects_lookalike_hosts() {
        for url in [
            "https://netflix.com/title/1",
            "https://notyoutube.com/watch?v=abc",
            "https://youtube.com.evil.example/watch",
            "https://unsupported.example/x",
        ] {
            assert!(
                matches!(classify(url), Err(Error::UnsupportedPlatform(_))),
                "{url} should be unsupported"
            );
        }
    }

    #[test]
    fn unparsable_url_is_unsupported() {
        assert!(matches!(
            classify("not a url"),
            Err(Error::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn audio_selector_ignores_platform_and_cap() {
        for platform in [
            MediaPlatform::YouTube,
            MediaPlatform::Instagram,
            MediaPlatform::Twitter,
        ] {
            assert_eq!(
                format_selector(platform, MediaKind::Audio, 720),
                "bestaudio[ext=m4a]/bestaudio/best"
            );
        }
    }

    #[test]
    fn primary_video_selector_merges_streams_under_cap() {
        assert_eq!(
            format_selector(MediaPlatform::YouTube, MediaKind::Video, 1080),
            "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best"
        );
    }

    #[test]
    fn secondary_video_selector_uses_single_stream() {
        assert_eq!(
            format_selector(MediaPlatform::Instagram, MediaKind::Video, 720),
            "best[height<=720][ext=mp4]/best[ext=mp4]/best"
        );
    }

    #[test]
    fn media_kind_parses_and_maps_extension() {
        assert_eq!("video".parse::<MediaKind>().unwrap().extension(), "mp4");
        assert_eq!("audio".parse::<MediaKind>().unwrap().extension(), "m4a");
        assert!(matches!(
            "gif".parse::<MediaKind>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn private_hosts_are_blocked() {
        for url in [
            "http://localhost:8080/x",
            "http://127.0.0.1/x",
            "http://10.1.2.3/x",
            "http://192.168.1.1/x",
            "http://172.20.0.1/x",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/x",
            "http://[fd00::1]/x",
        ] {
            assert!(ensure_public_host(url).is_err(), "{url} should be blocked");
        }
    }

    #[test]
    fn public_hosts_pass() {
        ensure_public_host("https://www.youtube.com/watch?v=abc").unwrap();
        ensure_public_host("https://172.32.0.1/x").unwrap();
    }
}
