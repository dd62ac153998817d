//! Masking of credentials in log output
//!
//! OAuth codes, client secrets and tokens travel through URLs, request
//! headers and upstream error bodies. Anything logged from those sources
//! goes through here first.

use axum::http::{HeaderMap, Uri};
use regex::Regex;
use std::sync::LazyLock;

/// Replacement for masked values
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_NAMES: &[&str] = &[
    "authorization",
    "cookie",
    "password",
    "secret",
    "token",
    "key",
    "code",
    "verifier",
];

// Compiled once from literals
#[allow(clippy::expect_used)]
static RE_KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b([a-z_\-]*(?:authorization|cookie|password|secret|token|key|code|verifier)[a-z_\-]*)(=|":\s*")([^&\s"]+)"#,
    )
    .expect("failed to compile regex: key_value")
});

#[allow(clippy::expect_used)]
static RE_BEARER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bearer\s+[a-z0-9._~+/\-]+=*").expect("failed to compile regex: bearer")
});

/// Whether a header or parameter name carries a credential
pub fn is_sensitive_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_NAMES.iter().any(|s| name.contains(s))
}

/// Header pairs safe to log, with credential values masked
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive_name(name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Mask `name=value` pairs, JSON string fields and bearer tokens in free text
pub fn redact_text(input: &str) -> String {
    let masked = RE_BEARER.replace_all(input, format!("Bearer {REDACTED}"));
    RE_KEY_VALUE
        .replace_all(&masked, format!("${{1}}${{2}}{REDACTED}"))
        .into_owned()
}

/// Request URI safe to log
///
/// Credential-named query values are masked, and so is the OAuth `state`
/// nonce, which is only sensitive in a URI.
pub fn redact_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };
    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_sensitive_name(name) || name.eq_ignore_ascii_case("state") => {
                format!("{name}={REDACTED}")
            }
            _ => pair.to_string(),
        })
        .collect();
    format!("{}?{}", uri.path(), pairs.join("&"))
}
