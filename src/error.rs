//! Error types for mediagrab
//!
//! This module provides the error taxonomy shared by every component:
//! - Domain-specific error types (download, OAuth, configuration)
//! - HTTP status code mapping for API integration
//! - The uniform JSON error envelope returned by the API

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for mediagrab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mediagrab
///
/// Each variant carries enough context to build a useful log line and a
/// client-facing message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.storage_dir")
        key: Option<String>,
    },

    /// Request failed input validation
    #[error("{0}")]
    Validation(String),

    /// URL or provider does not belong to a supported platform
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Client exceeded its request budget for the current window
    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds until the client's window resets
        retry_after_secs: u64,
    },

    /// Download pipeline error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// OAuth authorization-code exchange failed
    #[error("token exchange with {platform} failed: {message}")]
    TokenExchangeFailed {
        /// Provider identifier (e.g. "youtube")
        platform: String,
        /// Upstream HTTP status, when a response was received
        status: Option<u16>,
        /// What went wrong
        message: String,
    },

    /// Requested resource does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp missing, crashed, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while fetching and finalizing a media download
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The fetch tool finished but the output is missing or too small
    #[error("download incomplete: {reason} ({})", path.display())]
    Incomplete {
        /// Expected output path
        path: PathBuf,
        /// Why the output was rejected
        reason: String,
    },

    /// The fetch did not finish within the configured deadline
    #[error("download timed out after {timeout_secs} seconds")]
    TimedOut {
        /// Deadline that was exceeded
        timeout_secs: u64,
    },

    /// The download failed; partial output has been removed
    #[error("{platform} download failed: {reason}")]
    Failed {
        /// Platform the URL was classified as
        platform: String,
        /// Underlying cause
        reason: String,
    },
}

/// API error response format
///
/// Every failed request returns this envelope, with the request identifier
/// and the time the error was produced.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "unsupported_platform",
///     "message": "Unsupported platform: https://example.com/x",
///     "requestId": "0b8c5f0e-3f0d-4a55-9e0a-6f0b6e1f2c41",
///     "timestamp": "2024-05-01T12:00:00Z"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false
    pub success: bool,
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Identifier of the request that failed (echoed in the X-Request-Id header)
    pub request_id: String,

    /// RFC 3339 timestamp of the failure
    pub timestamp: String,

    /// Structured cause, only present when detailed errors are enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                request_id: String::new(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                details: None,
            },
        }
    }

    /// Attach the identifier of the request that produced this error
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.error.request_id = request_id.into();
        self
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,
            Error::UnsupportedPlatform(_) => 400,
            // Upstream status stays in the logs, the caller sent a bad code
            Error::TokenExchangeFailed { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 429 Too Many Requests
            Error::RateLimited { .. } => 429,

            // 500 Internal Server Error - Server-side issues
            Error::Download(_) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::Network(_) => 500,
            Error::Serialization(_) => 500,
            Error::ExternalTool(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::UnsupportedPlatform(_) => "unsupported_platform",
            Error::RateLimited { .. } => "rate_limit_exceeded",
            Error::Download(DownloadError::Incomplete { .. }) => "download_incomplete",
            Error::Download(DownloadError::TimedOut { .. }) => "fetch_timeout",
            Error::Download(DownloadError::Failed { .. }) => "download_failed",
            Error::TokenExchangeFailed { .. } => "token_exchange_failed",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl Error {
    /// Structured context for this error, used in detailed-error mode
    pub fn details(&self) -> serde_json::Value {
        let mut details = match self {
            Error::Config { key, .. } => serde_json::json!({ "key": key }),
            Error::RateLimited { retry_after_secs } => {
                serde_json::json!({ "retry_after_secs": retry_after_secs })
            }
            Error::Download(DownloadError::Incomplete { path, .. }) => {
                serde_json::json!({ "path": path })
            }
            Error::Download(DownloadError::TimedOut { timeout_secs }) => {
                serde_json::json!({ "timeout_secs": timeout_secs })
            }
            Error::Download(DownloadError::Failed { platform, .. }) => {
                serde_json::json!({ "platform": platform })
            }
            Error::TokenExchangeFailed {
                platform, status, ..
            } => serde_json::json!({
                "platform": platform,
                "upstream_status": status,
            }),
            _ => serde_json::json!({}),
        };
        if let Some(map) = details.as_object_mut() {
            map.insert("cause".into(), serde_json::json!(format!("{self:?}")));
        }
        details
    }
}

impl From<&Error> for ApiError {
    fn from(error: &Error) -> Self {
        ApiError::new(error.error_code(), error.to_string())
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::from(&error)
    }
}
