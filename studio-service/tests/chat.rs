mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use studio_service::services::providers::mock::{MockProvider, MockReply};
use studio_service::services::providers::ErrorKind;

#[tokio::test]
async fn ask_returns_answer_and_model() {
    let app = TestApp::with_provider(MockProvider::with_text("Paris.")).await;

    let (status, body) = app
        .post_json(
            "/ask",
            json!({"question": " Capital of France? ", "model": "gemini-2.5-pro"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["question"], "Capital of France?");
    assert_eq!(body["answer"], "Paris.");
    assert_eq!(body["model_used"], "gemini-2.5-pro");
}

#[tokio::test]
async fn unknown_model_falls_back_to_default() {
    let app = TestApp::with_provider(MockProvider::with_text("ok")).await;

    let (status, body) = app
        .post_json("/ask", json!({"question": "hi", "model": "claude-9"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "gemini-2.5-flash");
    assert_eq!(
        app.mock.as_ref().unwrap().last_request().unwrap().model,
        "gemini-2.5-flash"
    );
}

#[tokio::test]
async fn missing_question_is_rejected() {
    let app = TestApp::with_provider(MockProvider::with_text("ok")).await;

    let (status, body) = app.post_json("/ask", json!({"model": "gemini-2.5-pro"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide a 'question' in the request body.");
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let app = TestApp::with_provider(MockProvider::with_text("ok")).await;

    let (status, body) = app.post_json("/ask", json!({"question": "   "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question cannot be empty.");
    assert_eq!(app.provider_calls(), 0);
}

#[tokio::test]
async fn missing_client_wins_over_invalid_body() {
    let app = TestApp::without_provider().await;

    let (status, body) = app.post_raw("/ask", "garbage".to_string()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Gemini API client not initialized"));
}

#[tokio::test]
async fn empty_answer_is_an_error() {
    let app = TestApp::with_provider(MockProvider::new(MockReply::EmptyContent)).await;

    let (status, body) = app.post_json("/ask", json!({"question": "hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "No response generated. Please try rephrasing your question."
    );
}

#[tokio::test]
async fn unavailable_model_has_its_own_message() {
    let app = TestApp::with_provider(MockProvider::failing(ErrorKind::ModelNotFound)).await;

    let (status, body) = app.post_json("/ask", json!({"question": "hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not available. Please try a different model.");
}
