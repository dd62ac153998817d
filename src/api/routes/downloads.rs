//! Download, info probe and artifact retrieval handlers.

use super::{DownloadRequest, InfoQuery};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::platform::MediaKind;
use crate::types::{DownloadResult, MediaInfo};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// POST /api/download - Download media and register the artifact
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Media downloaded", body = DownloadResult),
        (status = 400, description = "Missing URL, bad type or unsupported platform", body = crate::error::ApiError),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ApiError),
        (status = 500, description = "Download failed", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResult>> {
    let Json(request) = payload.map_err(|e| Error::Validation(e.body_text()))?;

    let url = required_url(request.url.as_deref())?;
    let kind: MediaKind = request
        .kind
        .as_deref()
        .ok_or_else(|| {
            Error::Validation("Type is required and must be either \"video\" or \"audio\"".into())
        })?
        .parse()?;

    let result = state.service.downloads().download(url, kind).await?;
    Ok(Json(result))
}

/// GET /api/info - Metadata preview for a URL
#[utoipa::path(
    get,
    path = "/api/info",
    tag = "downloads",
    params(InfoQuery),
    responses(
        (status = 200, description = "Media information", body = MediaInfo),
        (status = 400, description = "Missing URL or unsupported platform", body = crate::error::ApiError),
        (status = 500, description = "Probe failed", body = crate::error::ApiError)
    )
)]
pub async fn get_info(
    State(state): State<AppState>,
    query: std::result::Result<Query<InfoQuery>, QueryRejection>,
) -> Result<Json<MediaInfo>> {
    let Query(query) = query.map_err(|e| Error::Validation(e.body_text()))?;
    let url = required_url(query.url.as_deref())?;

    let info = state.service.downloads().probe(url).await?;
    Ok(Json(info))
}

/// GET /temp/:filename - Stream a downloaded artifact
///
/// Only files with a live registry entry are served.
#[utoipa::path(
    get,
    path = "/temp/{filename}",
    tag = "downloads",
    params(
        ("filename" = String, Path, description = "Artifact file name")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid file name", body = crate::error::ApiError),
        (status = 404, description = "Unknown or expired artifact", body = crate::error::ApiError)
    )
)]
pub async fn serve_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let artifact = state.service.downloads().resolve_artifact(&filename).await?;

    let file = match tokio::fs::File::open(&artifact.file_path).await {
        Ok(file) => file,
        // swept between lookup and open
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("artifact {filename}")));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    tracing::debug!(
        filename = %artifact.filename,
        artifact_id = %artifact.id,
        size_bytes = length,
        "serving artifact"
    );

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&artifact.filename)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Disposition"),
    );
    Ok(response)
}

fn required_url(url: Option<&str>) -> Result<&str> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::Validation("URL is required".into()))
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("mp4") => "video/mp4",
        Some("m4a") => "audio/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
