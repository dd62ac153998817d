use super::*;
use crate::Config;
use crate::test_helpers::{StubBackend, create_test_service, create_test_service_with_config, test_config};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

mod auth;

/// Router over a stub backend with the default test config
async fn test_router(backend: StubBackend) -> (Router, Arc<MediaService>, tempfile::TempDir) {
    let (service, temp_dir) = create_test_service(backend).await;
    (create_router(service.clone()), service, temp_dir)
}

/// Router over a stub backend with a caller-adjusted config
async fn test_router_with(
    backend: StubBackend,
    adjust: impl FnOnce(&mut Config),
) -> (Router, Arc<MediaService>, tempfile::TempDir) {
    let (mut config, temp_dir) = test_config();
    adjust(&mut config);
    let (service, temp_dir) = create_test_service_with_config(backend, config, temp_dir).await;
    (create_router(service.clone()), service, temp_dir)
}

fn get(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and decode the body as JSON (Null when not JSON)
async fn send(app: &Router, request: Request) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

#[tokio::test]
async fn test_api_server_serves_and_stops() {
    let (service, _temp_dir) = create_test_service(StubBackend::writing(2000)).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, service, async {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(2000)).await;

    for uri in ["/", "/health", "/does-not-exist"] {
        let (_, headers, _) = send(&app, get(uri)).await;
        assert_eq!(headers["x-content-type-options"], "nosniff", "{uri}");
        assert_eq!(headers["x-frame-options"], "DENY", "{uri}");
        assert_eq!(
            headers["referrer-policy"], "strict-origin-when-cross-origin",
            "{uri}"
        );
        assert!(headers.contains_key("x-request-id"), "{uri}");
    }
}

#[tokio::test]
async fn test_request_id_is_echoed_in_header_and_envelope() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(2000)).await;

    let request = Request::builder()
        .uri("/temp/missing.mp4")
        .header("x-request-id", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers["x-request-id"], "trace-abc");
    assert_eq!(body["error"]["requestId"], "trace-abc");
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(2000)).await;
    let (status, _, body) = send(&app, get("/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(2000)).await;

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app, request).await;

    assert_eq!(
        headers["access-control-allow-origin"],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_cors_ignores_unlisted_origin() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(2000)).await;

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app, request).await;

    assert!(!headers.contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_disabled() {
    let (app, _service, _temp_dir) = test_router_with(StubBackend::writing(2000), |c| {
        c.api.cors_enabled = false;
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app, request).await;

    assert!(!headers.contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_detailed_errors_include_details() {
    let (app, _service, _temp_dir) = test_router_with(
        StubBackend::writing(2000).failing("ERROR: Unsupported URL"),
        |c| c.api.detailed_errors = true,
    )
    .await;

    let (status, _, body) = send(
        &app,
        post_json("/api/download", serde_json::json!({ "url": "https://youtu.be/x", "type": "video" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "download_failed");
    assert_eq!(body["error"]["details"]["platform"], "youtube");
}

/// Writer that appends formatted log output to a shared buffer
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_request_span_hides_oauth_callback_params() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NEW)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let request = get("/api/auth/callback/twitter?code=abc123&state=xyz789");
        let _entered = request_span(&request).entered();
    });

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("/api/auth/callback/twitter"), "{output}");
    assert!(!output.contains("abc123"), "{output}");
    assert!(!output.contains("xyz789"), "{output}");
}
