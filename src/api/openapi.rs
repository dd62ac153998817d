//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the mediagrab REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the mediagrab REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mediagrab REST API",
        version = "0.1.0",
        description = "Download media from social platforms and retrieve it as short-lived files",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:2500", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::download,
        crate::api::routes::get_info,
        crate::api::routes::serve_artifact,

        // Auth
        crate::api::routes::auth_url,
        crate::api::routes::check_platform,
        crate::api::routes::connect,
        crate::api::routes::disconnect,
        crate::api::routes::callback,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::readiness,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DownloadResult,
        crate::types::MediaInfo,
        crate::types::MediaFormat,
        crate::platform::MediaPlatform,
        crate::platform::MediaKind,
        crate::oauth::ConnectedPlatform,

        // API request/response types from routes
        crate::api::routes::DownloadRequest,
        crate::api::routes::ConnectRequest,
        crate::api::routes::AuthUrlResponse,
        crate::api::routes::CheckPlatformResponse,
        crate::api::routes::ConnectResponse,
        crate::api::routes::SuccessResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Download media and retrieve the resulting files"),
        (name = "auth", description = "Connect social platform accounts through OAuth"),
        (name = "system", description = "Banner, health, readiness and OpenAPI"),
    )
)]
pub struct ApiDoc;
