//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`]: download, info probe, artifact retrieval
//! - [`auth`]: platform OAuth flows
//! - [`system`]: banner, health, readiness, OpenAPI

use crate::oauth::ConnectedPlatform;
use serde::{Deserialize, Serialize};

mod auth;
mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use auth::*;
pub use downloads::*;
pub use system::*;

// ============================================================================
// Request types
// ============================================================================

/// Body of POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Media page URL
    pub url: Option<String>,
    /// "video" or "audio" (required)
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Query parameters for GET /api/info
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
pub struct InfoQuery {
    /// Media page URL
    pub url: Option<String>,
}

/// Body of POST /api/auth/connect/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConnectRequest {
    /// Authorization code returned by the provider
    pub code: Option<String>,
    /// State returned with the code (required for PKCE providers)
    pub state: Option<String>,
}

/// Query parameters of the provider redirect
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
pub struct CallbackQuery {
    /// Authorization code
    pub code: Option<String>,
    /// State echoed by the provider
    pub state: Option<String>,
    /// Error reported by the provider
    pub error: Option<String>,
    /// Human-readable provider error
    pub error_description: Option<String>,
}

// ============================================================================
// Response types
// ============================================================================

/// Response of GET /api/auth/auth-url/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    /// Always true
    pub success: bool,
    /// Provider authorize URL
    pub auth_url: String,
    /// State value the callback must carry
    pub state: String,
}

/// Response of GET /api/auth/check-platform/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckPlatformResponse {
    /// Always true
    pub success: bool,
    /// Whether a live token is held for the platform
    pub is_logged_in: bool,
}

/// Response of POST /api/auth/connect/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConnectResponse {
    /// Always true
    pub success: bool,
    /// The new connection
    pub platform: ConnectedPlatform,
}

/// Plain acknowledgement
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SuccessResponse {
    /// Always true
    pub success: bool,
}
