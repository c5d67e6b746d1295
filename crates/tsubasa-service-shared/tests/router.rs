mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::server_with;
use tsubasa_lib::test_utils::{BackendCall, MockBackend, MOCK_SERVER_VERSION};

#[tokio::test]
async fn root_says_hello() {
    let (server, _) = server_with(MockBackend::new()).await;

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "success": true,
        "status": 200,
        "data": { "hello": "world" }
    }));
}

#[tokio::test]
async fn info_reports_backend_health() {
    let (server, _) = server_with(MockBackend::new()).await;

    let body: Value = server.get("/info").await.json();
    let elastic = &body["data"]["elastic"];

    assert_eq!(body["data"]["version"], tsubasa_lib::VERSION);
    assert!(body["data"]["commit_sha"].is_string());
    assert!(body["data"]["build_date"].is_string());
    assert_eq!(elastic["healthy"], true);
    assert!(elastic["ping_ms"].as_i64().unwrap() >= 0);
    assert_eq!(elastic["server_version"], MOCK_SERVER_VERSION);
    assert_eq!(elastic["client_version"], tsubasa_lib::VERSION);
}

#[tokio::test]
async fn info_reports_unreachable_backend() {
    let (server, _) = server_with(MockBackend::new().with_failing_ping()).await;

    let response = server.get("/info").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["elastic"]["healthy"], false);
    assert_eq!(body["data"]["elastic"]["ping_ms"], -1);
}

#[tokio::test]
async fn unknown_routes_get_an_envelope() {
    let (server, _) = server_with(MockBackend::new()).await;

    let response = server.get("/does/not/exist").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"]["code"], "ROUTE_NOT_FOUND");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn wrong_method_gets_an_envelope() {
    let (server, _) = server_with(MockBackend::new()).await;

    let response = server.delete("/info").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_METHOD");

    let response = server.get("/elastic/books/search").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_METHOD");
}

#[tokio::test]
async fn head_is_served_like_get_without_a_body() {
    let (server, _) = server_with(MockBackend::new()).await;

    let response = server.method(Method::HEAD, "/").await;
    response.assert_status_ok();
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn health_probes() {
    let (server, _) = server_with(MockBackend::new()).await;
    server.get("/health/live").await.assert_status_ok();

    let response = server.get("/health/ready").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend_available"], true);
}

#[tokio::test]
async fn readiness_fails_when_backend_is_down() {
    let (server, _) = server_with(MockBackend::new().with_failing_ping()).await;

    server.get("/health/live").await.assert_status_ok();

    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert!(body["status"].as_str().unwrap().starts_with("not_ready"));
}

#[tokio::test]
async fn metrics_endpoint_answers_text() {
    let (server, _) = server_with(MockBackend::new()).await;

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    assert!(response.text().starts_with('#') || response.text().is_empty());
}

#[tokio::test]
async fn index_existence_is_reported() {
    let (server, backend) = server_with(MockBackend::new().with_index("books")).await;

    server
        .get("/elastic/books")
        .await
        .assert_json(&json!({ "success": true, "status": 200, "data": { "exists": true } }));

    let response = server.get("/elastic/missingindex").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "success": true, "status": 200, "data": { "exists": false } }));

    assert!(backend
        .calls()
        .contains(&BackendCall::IndexExists("missingindex".to_string())));
}

#[tokio::test]
async fn index_probe_failures_report_absent() {
    let (server, _) = server_with(MockBackend::new().with_broken_index("broken")).await;

    let response = server.get("/elastic/broken").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["exists"], false);
}

#[tokio::test]
async fn undecodable_index_gets_an_envelope() {
    let (server, backend) = server_with(MockBackend::new()).await;

    let response = server.get("/elastic/%FF").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 400);
    assert_eq!(body["error"]["code"], "INVALID_PATH");
    assert!(!backend
        .calls()
        .iter()
        .any(|call| matches!(call, BackendCall::IndexExists(_))));
}
