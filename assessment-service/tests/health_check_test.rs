//! Health, readiness and metrics endpoint tests.

mod common;

use assessment_service::config::InputMode;
use assessment_service::services::providers::mock::MockReply;
use assessment_service::services::ProviderError;
use common::TestApp;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn(InputMode::Fields, MockReply::Echo).await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "assessment-service");
    assert_eq!(body["provider"], "mock");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_follows_provider_health() {
    let ready = TestApp::spawn(InputMode::Fields, MockReply::Echo).await;
    assert_eq!(ready.get("/ready").await.status(), 200);

    let broken = TestApp::spawn(
        InputMode::Fields,
        MockReply::Fail(ProviderError::NotConfigured("OPENAI_API_KEY is not set".into())),
    )
    .await;
    assert_eq!(broken.get("/ready").await.status(), 503);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn(InputMode::Fields, MockReply::Echo).await;

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn metrics_endpoint_returns_text() {
    let app = TestApp::spawn(InputMode::Fields, MockReply::Echo).await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), 200);
    // The recorder is only installed by the binary, so tests see the placeholder
    let body = response.text().await.expect("Failed to read body");
    assert!(body.starts_with('#'));
}

#[tokio::test]
async fn unknown_path_without_static_dir_is_not_found() {
    let app = TestApp::spawn(InputMode::Fields, MockReply::Echo).await;

    assert_eq!(app.get("/nope").await.status(), 404);
}

#[tokio::test]
async fn front_end_is_served_from_static_dir() {
    use assessment_service::services::providers::mock::MockTextProvider;
    use std::sync::Arc;

    let static_dir = tempfile::tempdir().expect("Failed to create static dir");
    std::fs::write(static_dir.path().join("index.html"), "<h1>Intake</h1>").unwrap();
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = common::test_config(InputMode::Fields, temp_dir.path().to_path_buf(), 5);
    config.report.static_dir = Some(static_dir.path().to_path_buf());
    let address = common::serve(config, Arc::new(MockTextProvider::echo())).await;

    let response = reqwest::get(format!("{}/", address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    assert_eq!(response.text().await.unwrap(), "<h1>Intake</h1>");
}
