//! REST API server module
//!
//! Exposes downloads, artifact retrieval and platform OAuth over HTTP, with
//! an OpenAPI description generated from the handlers.

use crate::{MediaService, Result};
use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, Uri, header},
    middleware,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod context;
pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /api/download` - Download media, register the artifact
/// - `GET /api/info?url=` - Metadata preview
/// - `GET /temp/:filename` - Stream an artifact (prefix from `api.artifact_prefix`)
///
/// ## Auth
/// - `GET /api/auth/auth-url/:platform` - Provider authorize URL
/// - `GET /api/auth/check-platform/:platform` - Connection status
/// - `POST /api/auth/connect/:platform` - Exchange an authorization code
/// - `POST /api/auth/disconnect/:platform` - Forget a connection
/// - `GET /api/auth/callback/:platform` - Provider redirect target
///
/// ## System
/// - `GET /` - Service banner
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness probe
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(service: Arc<MediaService>) -> Router {
    let state = AppState::new(service.clone());
    let config = state.config.clone();
    let artifact_route = format!("{}/:filename", config.api.artifact_prefix);

    let router = Router::new()
        // Downloads
        .route("/api/download", post(routes::download))
        .route("/api/info", get(routes::get_info))
        .route(&artifact_route, get(routes::serve_artifact))
        // Auth
        .route("/api/auth/auth-url/:platform", get(routes::auth_url))
        .route(
            "/api/auth/check-platform/:platform",
            get(routes::check_platform),
        )
        .route("/api/auth/connect/:platform", post(routes::connect))
        .route("/api/auth/disconnect/:platform", post(routes::disconnect))
        .route("/api/auth/callback/:platform", get(routes::callback))
        // System
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/ready", get(routes::readiness))
        .route("/api/openapi.json", get(routes::openapi_spec))
        .fallback(route_not_found);

    // Swagger UI gets its own copy of the document to avoid a route clash
    let router = if config.api.swagger_ui {
        router.merge(
            SwaggerUi::new("/swagger-ui").url("/swagger-ui/openapi.json", ApiDoc::openapi()),
        )
    } else {
        router
    };

    let router = router.with_state(state);

    // Middleware layer ordering: in axum's onion model the LAST layer applied
    // is the OUTERMOST. Requests flow:
    //   Request context → Security headers → CORS → Trace → Rate limit → Handler
    let router = router
        .layer(middleware::from_fn_with_state(
            service.rate_limiter().clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(request_span));

    let router = if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    };

    router
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(middleware::from_fn_with_state(
            config.api.detailed_errors,
            context::request_context_middleware,
        ))
}

/// Trace span for one request; the URI is logged without OAuth credentials
fn request_span(request: &Request) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        uri = %crate::redact::redact_uri(request.uri()),
        version = ?request.version(),
    )
}

async fn route_not_found(uri: Uri) -> crate::Error {
    crate::Error::NotFound(format!("route {}", uri.path()))
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. Download-related response
/// headers are exposed so browser clients can read them.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        header::CONTENT_DISPOSITION,
        context::REQUEST_ID_HEADER,
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderName::from_static("x-ratelimit-reset"),
        header::RETRY_AFTER,
    ];

    let allow_any = origins.iter().any(|o| o == "*");
    let cors = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    cors.allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed)
}

/// Start the API server on the configured bind address.
///
/// Serves until `shutdown` resolves, then finishes in-flight requests and
/// returns. The caller owns the service lifecycle (`start`/`shutdown`).
///
/// # Example
///
/// ```no_run
/// use mediagrab::{Config, MediaService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Arc::new(MediaService::new(Config::default()).await?);
/// service.start();
///
/// mediagrab::api::start_api_server(service.clone(), async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// service.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(service: Arc<MediaService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = service.config().api.bind_address;
    let listener = TcpListener::bind(bind_address).await?;
    serve(listener, service, shutdown).await
}

/// Serve the API on an already bound listener
pub async fn serve<F>(listener: TcpListener, service: Arc<MediaService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    tracing::info!(address = %address, "API server listening");

    let app = create_router(service);

    // into_make_service_with_connect_info provides ConnectInfo<SocketAddr>
    // for the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
