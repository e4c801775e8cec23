#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::Secret;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use studio_service::config::{
    GoogleConfig, HousekeepingConfig, ModelConfig, ServerConfig, StorageConfig, StudioConfig,
};
use studio_service::services::providers::mock::{sample_png, MockProvider};
use studio_service::services::providers::ContentProvider;
use studio_service::startup::{build_router, build_state};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ANALYSIS_MODEL: &str = "gemini-1.5-flash";
pub const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

pub fn test_config(dir: &Path) -> StudioConfig {
    StudioConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        google: GoogleConfig {
            api_key: None,
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
        },
        models: ModelConfig {
            analysis_model: ANALYSIS_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
            default_chat_model: "gemini-2.5-flash".to_string(),
        },
        storage: StorageConfig {
            generated_dir: dir.join("generated_images"),
        },
        housekeeping: HousekeepingConfig {
            enabled: false,
            ..HousekeepingConfig::default()
        },
        session_secret: Secret::new("test-secret".to_string()),
        max_request_bytes: 25 * 1024 * 1024,
        server: ServerConfig::default(),
        otlp_endpoint: None,
    }
}

/// Router wired to a mock provider (or none) and a throwaway image directory.
pub struct TestApp {
    pub router: Router,
    pub mock: Option<Arc<MockProvider>>,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn with_provider(mock: MockProvider) -> Self {
        Self::build(Some(Arc::new(mock))).await
    }

    pub async fn without_provider() -> Self {
        Self::build(None).await
    }

    async fn build(mock: Option<Arc<MockProvider>>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(dir.path());
        let provider = mock.clone().map(|m| m as Arc<dyn ContentProvider>);

        let state = build_state(&config, provider)
            .await
            .expect("Failed to build state");
        let router = build_router(state, &config);

        Self { router, mock, dir }
    }

    pub fn images_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("generated_images")
    }

    pub fn provider_calls(&self) -> usize {
        self.mock.as_ref().map(|m| m.call_count()).unwrap_or(0)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(path, body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(path)
            .header("host", "studio.test:8080")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn png_base64(width: u32, height: u32) -> String {
    BASE64.encode(sample_png(width, height))
}

pub fn decode(value: &Value) -> Vec<u8> {
    BASE64
        .decode(value.as_str().expect("expected base64 string"))
        .expect("invalid base64 in response")
}
