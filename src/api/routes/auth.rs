//! Platform OAuth handlers.

use super::{
    AuthUrlResponse, CallbackQuery, CheckPlatformResponse, ConnectRequest, ConnectResponse,
    SuccessResponse,
};
use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// GET /api/auth/auth-url/:platform - Provider authorize URL
#[utoipa::path(
    get,
    path = "/api/auth/auth-url/{platform}",
    tag = "auth",
    params(
        ("platform" = String, Path, description = "instagram, youtube, tiktok or twitter")
    ),
    responses(
        (status = 200, description = "Authorize URL", body = AuthUrlResponse),
        (status = 400, description = "Unknown or unconfigured platform", body = crate::error::ApiError)
    )
)]
pub async fn auth_url(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<AuthUrlResponse>> {
    let request = state.service.oauth().authorize_url(&platform).await?;
    Ok(Json(AuthUrlResponse {
        success: true,
        auth_url: request.url,
        state: request.state,
    }))
}

/// GET /api/auth/check-platform/:platform - Whether a platform is connected
#[utoipa::path(
    get,
    path = "/api/auth/check-platform/{platform}",
    tag = "auth",
    params(
        ("platform" = String, Path, description = "Platform id")
    ),
    responses(
        (status = 200, description = "Connection status", body = CheckPlatformResponse),
        (status = 400, description = "Unknown platform", body = crate::error::ApiError)
    )
)]
pub async fn check_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<CheckPlatformResponse>> {
    let is_logged_in = state.service.oauth().is_connected(&platform).await?;
    Ok(Json(CheckPlatformResponse {
        success: true,
        is_logged_in,
    }))
}

/// POST /api/auth/connect/:platform - Exchange an authorization code
#[utoipa::path(
    post,
    path = "/api/auth/connect/{platform}",
    tag = "auth",
    params(
        ("platform" = String, Path, description = "Platform id")
    ),
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Platform connected", body = ConnectResponse),
        (status = 400, description = "Bad code, unknown platform or rejected exchange", body = crate::error::ApiError)
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: std::result::Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>> {
    let Json(request) = payload.map_err(|e| Error::Validation(e.body_text()))?;
    let code = request
        .code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::Validation("Authorization code is required".into()))?;

    let connected = state
        .service
        .oauth()
        .connect(&platform, code, request.state.as_deref())
        .await?;
    Ok(Json(ConnectResponse {
        success: true,
        platform: connected,
    }))
}

/// POST /api/auth/disconnect/:platform - Forget a platform connection
#[utoipa::path(
    post,
    path = "/api/auth/disconnect/{platform}",
    tag = "auth",
    params(
        ("platform" = String, Path, description = "Platform id")
    ),
    responses(
        (status = 200, description = "Disconnected", body = SuccessResponse),
        (status = 400, description = "Unknown platform", body = crate::error::ApiError)
    )
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.service.oauth().disconnect(&platform).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/auth/callback/:platform - Provider redirect target
///
/// Completes the exchange and redirects to the platform's configured
/// frontend URI with either `success=true` or an `error` message.
#[utoipa::path(
    get,
    path = "/api/auth/callback/{platform}",
    tag = "auth",
    params(
        ("platform" = String, Path, description = "Platform id"),
        CallbackQuery
    ),
    responses(
        (status = 302, description = "Redirect to the frontend"),
        (status = 400, description = "Unknown or unconfigured platform", body = crate::error::ApiError)
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let oauth = state.service.oauth();
    let target = oauth.redirect_uri(&platform)?;
    let platform_id = oauth.provider(&platform)?.id;

    let outcome = match (query.error, query.code) {
        (Some(error), _) => Err(query.error_description.unwrap_or(error)),
        (None, None) => Err("Authorization code is required".to_string()),
        (None, Some(code)) => oauth
            .connect(platform_id, &code, query.state.as_deref())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    let separator = if target.contains('?') { '&' } else { '?' };
    let location = match outcome {
        Ok(()) => format!("{target}{separator}success=true&platform={platform_id}"),
        Err(message) => {
            tracing::warn!(platform = platform_id, error = %crate::redact::redact_text(&message), "OAuth callback failed");
            format!("{target}{separator}error={}", urlencoding::encode(&message))
        }
    };

    let location = HeaderValue::from_str(&location)
        .map_err(|e| Error::Other(format!("invalid redirect location: {e}")))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
