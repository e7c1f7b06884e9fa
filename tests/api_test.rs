// Integration tests for the HTTP API against a simulated Amplifi upstream

use amplifi_connector::amplifi::{
    AmplifiConnector, ChatSourceConfig, MemoryTokenCache, CHAT_PATH, LOGIN_PATH,
};
use amplifi_connector::api::{create_router, AppState};
use amplifi_connector::auth::JwtKeys;
use amplifi_connector::config::AmplifiConfig;
use amplifi_connector::users::UserStore;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app(upstream_url: &str) -> Router {
    let config = AmplifiConfig {
        api_url: upstream_url.to_string(),
        username: "svc-user".to_string(),
        password: "svc-pass".to_string(),
        token_cache_path: "unused.json".to_string(),
        timeout_seconds: 5,
        crm: ChatSourceConfig::new("crm-app", "crm-session"),
        mail: ChatSourceConfig::new("mail-app", "mail-session"),
    };
    let connector =
        AmplifiConnector::with_cache(&config, Arc::new(MemoryTokenCache::new())).unwrap();

    create_router(AppState {
        connector: Arc::new(connector),
        users: Arc::new(UserStore::new(":memory:").unwrap()),
        jwt: JwtKeys::new("integration-secret", 60),
    })
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Sign up and log in a user, returning the session token.
async fn register_and_login(app: &Router) -> String {
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "ada@example.com", "username": "ada", "password": "pw-123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/login",
            json!({"email": "ada@example.com", "password": "pw-123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

async fn upstream() -> ServerGuard {
    Server::new_async().await
}

#[tokio::test]
async fn test_health_check() {
    let server = upstream().await;
    let app = create_test_app(&server.url());

    let (status, body) = send(&app, get_request("/api/v1/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_signup_returns_profile_without_password() {
    let server = upstream().await;
    let app = create_test_app(&server.url());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "ada@example.com", "username": "ada", "password": "pw-123"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["username"], "ada");
    assert!(body["id"].is_string());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_duplicates_rejected() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    register_and_login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "ada@example.com", "username": "other", "password": "x"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "other@example.com", "username": "ada", "password": "x"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already taken");
}

#[tokio::test]
async fn test_signup_invalid_email_rejected() {
    let server = upstream().await;
    let app = create_test_app(&server.url());

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "not-an-email", "username": "ada", "password": "pw"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    register_and_login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/login",
            json!({"email": "ada@example.com", "password": "wrong"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Incorrect email or password");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/login",
            json!({"email": "nobody@example.com", "password": "pw-123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let (status, body) = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");

    let (status, body) = send(&app, get_request("/api/v1/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");

    let (status, _) = send(&app, get_request("/api/v1/auth/me", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_query_requires_authentication() {
    let mut server = upstream().await;
    let login = server
        .mock("POST", LOGIN_PATH)
        .expect(0)
        .create_async()
        .await;
    let app = create_test_app(&server.url());

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/query", json!({"query": "hi"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    login.assert_async().await;
}

#[tokio::test]
async fn test_query_forwards_and_extracts_answer() {
    let mut server = upstream().await;
    let login = server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token": "upstream-token", "expires_in": 3600}"#)
        .expect(1)
        .create_async()
        .await;
    let chat = server
        .mock("POST", CHAT_PATH)
        .match_header("authorization", "Bearer upstream-token")
        .match_body(Matcher::PartialJson(json!({
            "chat_app_id": "crm-app",
            "chat_session_id": "crm-session",
            "query": "Top deals this week?"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"responses": [{"response": "Acme and Globex."}], "contexts": ["deals"]}"#)
        .expect(2)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    for source in [json!("Zoho CRM"), Value::Null] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/query",
                json!({"query": "Top deals this week?", "chat_source": source}),
                Some(&token),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Acme and Globex.");
        assert_eq!(body["contexts"], json!(["deals"]));
    }

    // Second query reused the cached upstream token
    login.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn test_query_with_unknown_source_is_bad_request() {
    let mut server = upstream().await;
    let login = server
        .mock("POST", LOGIN_PATH)
        .expect(0)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/query",
            json!({"query": "hi", "chat_source": "bogus"}),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .ends_with("Valid options: crm, mail"));
    login.assert_async().await;
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/query", json!({"query": "   "}), Some(&token)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_422_is_server_error_with_details() {
    let mut server = upstream().await;
    let _login = server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token": "upstream-token"}"#)
        .create_async()
        .await;
    let _chat = server
        .mock("POST", CHAT_PATH)
        .with_status(422)
        .with_body(r#"{"detail": "chat_session_id not found"}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/v1/query", json!({"query": "hi"}), Some(&token)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to process query: "));
    assert!(detail.contains("422"));
    assert!(detail.contains("chat_session_id not found"));
}

#[tokio::test]
async fn test_connection_endpoint() {
    let mut server = upstream().await;
    let _login = server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token": "0123456789abcdefghij"}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app, get_request("/api/v1/test/connection", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["token_preview"], "0123456789abcdefghij...");
    assert_eq!(body["token_length"], 20);
}

#[tokio::test]
async fn test_connection_endpoint_reports_login_failure() {
    let mut server = upstream().await;
    let _login = server
        .mock("POST", LOGIN_PATH)
        .with_status(401)
        .with_body(r#"{"detail": "Incorrect username or password"}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app, get_request("/api/v1/test/connection", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Connection test failed: "));
}

fn raw_request(
    uri: &str,
    content_type: Option<&str>,
    body: &str,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_signup_missing_field_is_json_bad_request() {
    let server = upstream().await;
    let app = create_test_app(&server.url());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/signup",
            json!({"email": "a@b.co"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Invalid request body: "));
    assert!(detail.contains("username"));
}

#[tokio::test]
async fn test_query_missing_query_field_is_json_bad_request() {
    let mut server = upstream().await;
    let login = server
        .mock("POST", LOGIN_PATH)
        .expect(0)
        .create_async()
        .await;
    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/query",
            json!({"chat_source": "crm"}),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("query"));
    login.assert_async().await;
}

#[tokio::test]
async fn test_non_json_bodies_are_json_bad_requests() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    let token = register_and_login(&app).await;

    let cases = [
        ("/api/v1/query", Some("application/json"), "query=hi", Some(token.as_str())),
        ("/api/v1/query", None, r#"{"query": "hi"}"#, Some(token.as_str())),
        ("/api/v1/auth/login", Some("application/json"), "{", None),
    ];

    for (uri, content_type, body, token) in cases {
        let (status, json) = send(&app, raw_request(uri, content_type, body, token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?}", uri, body);
        assert!(json["detail"].is_string(), "{} {:?}", uri, body);
    }
}

#[tokio::test]
async fn test_concurrent_logins_succeed() {
    let server = upstream().await;
    let app = create_test_app(&server.url());
    register_and_login(&app).await;

    let login = || {
        send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth/login",
                json!({"email": "ada@example.com", "password": "pw-123"}),
                None,
            ),
        )
    };
    let ((first, _), (second, _), (third, _)) = tokio::join!(login(), login(), login());

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(third, StatusCode::OK);
}
