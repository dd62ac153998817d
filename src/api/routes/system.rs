//! System handlers: banner, health, readiness, OpenAPI.

use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// GET / - Service banner
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service name and version")
    )
)]
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Media download API"
    }))
}

/// GET /health - Health check
///
/// Always 200; `status` is "degraded" when a dependency check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health with dependency checks")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let fetcher = state.service.fetcher();
    let ytdlp = match tokio::time::timeout(VERSION_CHECK_TIMEOUT, fetcher.backend_version()).await
    {
        Ok(Ok(version)) => json!({ "status": "ok", "backend": fetcher.backend_name(), "version": version }),
        Ok(Err(e)) => json!({ "status": "error", "backend": fetcher.backend_name(), "error": e.to_string() }),
        Err(_) => json!({ "status": "error", "backend": fetcher.backend_name(), "error": "version check timed out" }),
    };

    let storage_dir = &state.config.download.storage_dir;
    let storage = if tokio::fs::metadata(storage_dir)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        json!({ "status": "ok" })
    } else {
        json!({ "status": "error", "error": "storage directory missing" })
    };

    let status = if ytdlp["status"] == "ok" && storage["status"] == "ok" {
        "ok"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptimeSeconds": state.service.uptime().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "activeFetches": fetcher.active_fetches(),
        "artifacts": state.service.artifacts().len().await,
        "checks": {
            "ytdlp": ytdlp,
            "storage": storage
        }
    }))
}

/// GET /ready - Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "system",
    responses(
        (status = 200, description = "Ready to accept downloads"),
        (status = 503, description = "Storage directory is not writable")
    )
)]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match probe_writable(&state.config.download.storage_dir).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ready": true }))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ready": false, "reason": format!("storage not writable: {e}") })),
            )
        }
    }
}

async fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(format!(".ready-{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await
}

/// GET /api/openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
