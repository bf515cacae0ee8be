//! # OAuth Flow Integration Tests
//!
//! Login redirect, callback state checking and hand-off of the code to the
//! backend, which is mocked with `wiremock`.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use platform_web_proxy::core::config::OAuthSettings;
use platform_web_proxy::{build_router, AppState, AuthMode, PlatformConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT_URL: &str = "https://app.example.com/api/auth/callback";

fn oauth_settings() -> OAuthSettings {
    OAuthSettings {
        client_id: "dashboard".to_string(),
        auth_url: "https://idp.example.com/authorize".to_string(),
        token_url: "https://idp.example.com/token".to_string(),
        redirect_url: REDIRECT_URL.to_string(),
        ..OAuthSettings::default()
    }
}

async fn oauth_server(mode: AuthMode) -> (TestServer, MockServer) {
    let backend = MockServer::start().await;
    let mut config = PlatformConfig::default()
        .with_backend_url(format!("{}/api", backend.uri()))
        .with_auth_mode(mode);
    config.auth.oauth = Some(oauth_settings());
    let state = AppState::new(config).unwrap();
    (TestServer::new(build_router(Arc::new(state))).unwrap(), backend)
}

#[tokio::test]
async fn test_login_redirects_to_provider_with_flow_cookies() {
    let (server, _backend) = oauth_server(AuthMode::OAuth).await;

    let response = server.get("/api/auth/login").await;

    assert_eq!(response.status_code(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.starts_with("https://idp.example.com/authorize?"));

    let params: HashMap<String, String> = url::Url::parse(&location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect();
    assert_eq!(params["redirect_uri"], REDIRECT_URL);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    let state_cookie = format!("platform_oauth_state={};", params["state"]);
    assert!(cookies.iter().any(|c| c.starts_with(&state_cookie)));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("Secure")));
}

#[tokio::test]
async fn test_callback_hands_code_to_backend_and_redirects() {
    let (server, backend) = oauth_server(AuthMode::OAuth).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/oauth/callback"))
        .and(body_json(json!({
            "code": "auth-code",
            "code_verifier": "verifier-123",
            "redirect_uri": REDIRECT_URL,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "session=new-session; Path=/; HttpOnly")
                .set_body_json(json!({"ok": true})),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let response = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "csrf-abc")
        .add_header(
            header::COOKIE,
            HeaderValue::from_static("platform_oauth_state=csrf-abc; platform_oauth_verifier=verifier-123"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION),
        Some(&HeaderValue::from_static("/dashboard"))
    );
    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 3);
    assert!(cookies.contains(&"session=new-session; Path=/; HttpOnly".to_string()));
    for name in ["platform_oauth_state", "platform_oauth_verifier"] {
        let expired = cookies
            .iter()
            .find(|c| c.starts_with(&format!("{}=;", name)))
            .unwrap();
        assert!(expired.contains("Max-Age=0"));
        assert!(expired.contains("Path=/api/auth"));
    }
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch_without_backend_call() {
    let (server, backend) = oauth_server(AuthMode::OAuth).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let response = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "forged")
        .add_header(
            header::COOKIE,
            HeaderValue::from_static("platform_oauth_state=csrf-abc; platform_oauth_verifier=v"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_callback_requires_both_flow_cookies() {
    let (server, backend) = oauth_server(AuthMode::OAuth).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let without_verifier = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "csrf-abc")
        .add_header(header::COOKIE, HeaderValue::from_static("platform_oauth_state=csrf-abc"))
        .await;
    assert_eq!(without_verifier.status_code(), StatusCode::BAD_REQUEST);
    let body = without_verifier.json::<Value>();
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["message"], "Invalid request: Missing PKCE verifier cookie");

    let without_state = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "csrf-abc")
        .add_header(header::COOKIE, HeaderValue::from_static("platform_oauth_verifier=v"))
        .await;
    assert_eq!(without_state.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        without_state.json::<Value>()["message"],
        "Invalid request: Missing OAuth state cookie"
    );
}

#[tokio::test]
async fn test_callback_with_malformed_query_returns_envelope() {
    let (server, backend) = oauth_server(AuthMode::OAuth).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let response = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "first")
        .add_query_param("state", "second")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_callback_reports_provider_error() {
    let (server, _backend) = oauth_server(AuthMode::OAuth).await;

    let response = server
        .get("/api/auth/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("error_description", "User cancelled")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let message = response.json::<Value>()["message"].as_str().unwrap().to_string();
    assert!(message.contains("access_denied"));
    assert!(message.contains("User cancelled"));
}

#[tokio::test]
async fn test_callback_relays_backend_rejection() {
    let (server, backend) = oauth_server(AuthMode::OAuth).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/oauth/callback"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "User not provisioned"})))
        .mount(&backend)
        .await;

    let response = server
        .get("/api/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "s")
        .add_header(
            header::COOKIE,
            HeaderValue::from_static("platform_oauth_state=s; platform_oauth_verifier=v"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body = response.json::<Value>();
    assert_eq!(body["status"], 403);
    assert_eq!(body["message"], "User not provisioned");
}

#[tokio::test]
async fn test_oauth_routes_rejected_in_legacy_mode() {
    let (server, _backend) = oauth_server(AuthMode::Legacy).await;

    let login = server.get("/api/auth/login").await;
    assert_eq!(login.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(login.json::<Value>()["error"], "mode_mismatch");

    let callback = server
        .get("/api/auth/callback")
        .add_query_param("code", "c")
        .add_query_param("state", "s")
        .await;
    assert_eq!(callback.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(callback.json::<Value>()["error"], "mode_mismatch");
}

#[tokio::test]
async fn test_login_without_client_configuration_is_a_server_error() {
    let backend = MockServer::start().await;
    let config = PlatformConfig::default()
        .with_backend_url(format!("{}/api", backend.uri()))
        .with_auth_mode(AuthMode::OAuth);
    let state = AppState::new(config).unwrap();
    let server = TestServer::new(build_router(Arc::new(state))).unwrap();

    let response = server.get("/api/auth/login").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], "configuration_error");
}
