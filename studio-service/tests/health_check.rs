mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{test_config, TestApp};
use std::sync::Arc;
use std::time::Duration;
use studio_service::services::metrics::init_metrics;
use studio_service::services::providers::mock::MockProvider;
use studio_service::services::providers::{ContentProvider, ErrorKind};
use studio_service::startup::Application;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_api_availability() {
    let app = TestApp::without_provider().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["gemini_api"], "unavailable");
    assert_eq!(body["capabilities"]["image_generation"][0], "text-to-image generation");

    let app = TestApp::with_provider(MockProvider::with_text("ok")).await;
    let (_, body) = app.get("/health").await;
    assert_eq!(body["gemini_api"], "available");
    assert_eq!(
        body["models"],
        serde_json::json!(["gemini-1.5-flash", "gemini-2.0-flash-preview-image-generation"])
    );
}

#[tokio::test]
async fn readiness_follows_client_configuration() {
    let app = TestApp::without_provider().await;
    let (status, _) = app.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = TestApp::with_provider(MockProvider::with_text("ok")).await;
    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn readiness_fails_when_provider_health_check_fails() {
    let app = TestApp::with_provider(MockProvider::failing(ErrorKind::Credential)).await;
    let (status, body) = app.get("/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["gemini_api"], "unreachable");
    assert_eq!(body["reason"], "credential");
}

#[tokio::test]
async fn api_docs_honour_forwarded_proto_and_host() {
    let app = TestApp::without_provider().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api")
                .header("host", "10.0.0.5:8080")
                .header("x-forwarded-proto", "https")
                .header("x-forwarded-host", "studio.example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["base_url"], "https://studio.example.org/");
}

#[tokio::test]
async fn api_docs_use_request_host() {
    let app = TestApp::without_provider().await;
    let (status, body) = app.get("/api").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "2.0");
    assert_eq!(body["base_url"], "http://studio.test:8080/");
    assert!(body["endpoints"]["image_generation"]["/compose_images"].is_object());
    assert_eq!(body["styles"].as_array().unwrap().len(), 10);
    assert_eq!(body["aspect_ratios"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::without_provider().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "abc-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_text() {
    init_metrics().expect("Failed to install recorder");
    let app = TestApp::without_provider().await;

    // Produce at least one series.
    app.get("/health").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn server_serves_and_stops_on_shutdown_token() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let provider: Arc<dyn ContentProvider> = Arc::new(MockProvider::with_text("ok"));

    let app = Application::build_with_provider(config, Some(provider))
        .await
        .expect("Failed to build application");
    let port = app.port();
    let shutdown = app.shutdown_token();
    let server = tokio::spawn(app.run_until_stopped());

    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    let mut response = None;
    for _ in 0..50 {
        if let Ok(r) = client.get(&url).send().await {
            response = Some(r);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let response = response.expect("server never became reachable");
    assert!(response.status().is_success());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
