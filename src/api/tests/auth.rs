use super::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn configure_instagram(config: &mut Config, token_url: Option<String>) {
    let instagram = config
        .oauth
        .platforms
        .get_mut("instagram")
        .unwrap();
    instagram.client_id = "ig-client".into();
    instagram.client_secret = "ig-secret".into();
    instagram.redirect_uri = "http://localhost:5173/auth/callback/instagram".into();
    instagram.token_url = token_url;
}

async fn token_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=good-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-123",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=bad-code"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_auth_url_for_configured_platform() {
    let (app, _service, _temp_dir) =
        test_router_with(StubBackend::writing(0), |c| configure_instagram(c, None)).await;

    let (status, _, body) = send(&app, get("/api/auth/auth-url/instagram")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let url = body["authUrl"].as_str().unwrap();
    assert!(url.starts_with("https://api.instagram.com/oauth/authorize?"));
    assert!(url.contains("client_id=ig-client"));
    assert!(url.contains("response_type=code"));
    assert!(!body["state"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_url_for_unconfigured_platform_is_400() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(0)).await;

    let (status, _, body) = send(&app, get("/api/auth/auth-url/youtube")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_auth_url_for_unknown_platform_is_400() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(0)).await;

    let (status, _, body) = send(&app, get("/api/auth/auth-url/myspace")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "unsupported_platform");
}

#[tokio::test]
async fn test_check_platform_starts_disconnected() {
    let (app, _service, _temp_dir) = test_router(StubBackend::writing(0)).await;

    let (status, _, body) = send(&app, get("/api/auth/check-platform/Instagram")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["isLoggedIn"], false);
}

#[tokio::test]
async fn test_connect_check_disconnect_flow() {
    let server = token_server().await;
    let token_url = format!("{}/token", server.uri());
    let (app, _service, _temp_dir) = test_router_with(StubBackend::writing(0), |c| {
        configure_instagram(c, Some(token_url))
    })
    .await;

    let (status, _, body) = send(
        &app,
        post_json("/api/auth/connect/instagram", json!({ "code": "good-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["platform"]["id"], "instagram");
    assert_eq!(body["platform"]["isConnected"], true);
    assert_eq!(body["platform"]["accessToken"], "at-123");

    let (_, _, body) = send(&app, get("/api/auth/check-platform/instagram")).await;
    assert_eq!(body["isLoggedIn"], true);

    let (status, _, body) = send(
        &app,
        post_json("/api/auth/disconnect/instagram", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, _, body) = send(&app, get("/api/auth/check-platform/instagram")).await;
    assert_eq!(body["isLoggedIn"], false);
}

#[tokio::test]
async fn test_connect_requires_code() {
    let (app, _service, _temp_dir) =
        test_router_with(StubBackend::writing(0), |c| configure_instagram(c, None)).await;

    let (status, _, body) = send(&app, post_json("/api/auth/connect/instagram", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Authorization code is required");
}

#[tokio::test]
async fn test_connect_rejected_by_provider() {
    let server = token_server().await;
    let token_url = format!("{}/token", server.uri());
    let (app, _service, _temp_dir) = test_router_with(StubBackend::writing(0), |c| {
        configure_instagram(c, Some(token_url))
    })
    .await;

    let (status, _, body) = send(
        &app,
        post_json("/api/auth/connect/instagram", json!({ "code": "bad-code" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "token_exchange_failed");

    let (_, _, body) = send(&app, get("/api/auth/check-platform/instagram")).await;
    assert_eq!(body["isLoggedIn"], false);
}

#[tokio::test]
async fn test_callback_redirects_with_success() {
    let server = token_server().await;
    let token_url = format!("{}/token", server.uri());
    let (app, _service, _temp_dir) = test_router_with(StubBackend::writing(0), |c| {
        configure_instagram(c, Some(token_url))
    })
    .await;

    let (status, headers, _) = send(&app, get("/api/auth/callback/instagram?code=good-code")).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers["location"],
        "http://localhost:5173/auth/callback/instagram?success=true&platform=instagram"
    );
}

#[tokio::test]
async fn test_callback_redirects_with_provider_error() {
    let (app, _service, _temp_dir) =
        test_router_with(StubBackend::writing(0), |c| configure_instagram(c, None)).await;

    let (status, headers, _) = send(
        &app,
        get("/api/auth/callback/instagram?error=access_denied&error_description=User%20denied"),
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers["location"],
        "http://localhost:5173/auth/callback/instagram?error=User%20denied"
    );
}

#[tokio::test]
async fn test_callback_without_code_redirects_with_error() {
    let (app, _service, _temp_dir) =
        test_router_with(StubBackend::writing(0), |c| configure_instagram(c, None)).await;

    let (status, headers, _) = send(&app, get("/api/auth/callback/instagram")).await;

    assert_eq!(status, StatusCode::FOUND);
    let location = headers["location"].to_str().unwrap();
    assert!(location.contains("?error=Authorization%20code%20is%20required"));
}
