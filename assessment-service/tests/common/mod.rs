//! Test helpers for assessment-service integration tests.
//!
//! Each [`TestApp`] runs the real router on a random port with a mock
//! generation provider and its own temp directory for report files.

#![allow(dead_code)]

use assessment_service::config::{
    AssessmentConfig, GenerationConfig, InputMode, ProviderKind, ReportConfig,
};
use assessment_service::services::providers::mock::{MockReply, MockTextProvider};
use assessment_service::services::TextProvider;
use assessment_service::startup::Application;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Running application plus handles to inspect what it did.
pub struct TestApp {
    pub address: String,
    pub provider: Arc<MockTextProvider>,
    pub temp_dir: TempDir,
    client: reqwest::Client,
}

pub fn test_config(mode: InputMode, temp_dir: PathBuf, timeout_secs: u64) -> AssessmentConfig {
    AssessmentConfig {
        common: service_core::config::Config {
            port: 0,
            log_level: "info".to_string(),
        },
        generation: GenerationConfig {
            provider: ProviderKind::Mock,
            api_key: String::new(),
            model: "mock".to_string(),
            base_url: None,
            timeout_secs,
            temperature: None,
            max_output_tokens: None,
        },
        report: ReportConfig {
            input_mode: mode,
            temp_dir,
            static_dir: None,
            body_limit_bytes: 1_048_576,
        },
    }
}

/// Serve `config` with `provider` on a random port and return the base URL.
pub async fn serve(config: AssessmentConfig, provider: Arc<dyn TextProvider>) -> String {
    let app = Application::build_with_provider(config, provider)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    address
}

impl TestApp {
    /// Spawn the application in `mode` with a mock that answers `reply`.
    pub async fn spawn(mode: InputMode, reply: MockReply) -> Self {
        Self::spawn_with_timeout(mode, reply, 5).await
    }

    pub async fn spawn_with_timeout(mode: InputMode, reply: MockReply, timeout_secs: u64) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(mode, temp_dir.path().to_path_buf(), timeout_secs);
        let provider = Arc::new(MockTextProvider::new(reply));
        let address = serve(config, provider.clone() as Arc<dyn TextProvider>).await;

        TestApp {
            address,
            provider,
            temp_dir,
            client: reqwest::Client::new(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a JSON body to a report endpoint.
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// POST a raw body with a JSON content type.
    pub async fn post_raw(&self, path: &str, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("content-type", "application/json")
            .body(body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Files currently left in the report temp directory.
    pub fn transient_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_dir.path())
            .expect("Failed to read temp dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect()
    }

    /// Poll until the temp directory is empty. Cleanup runs when the server
    /// drops the response body, which can trail the client by a moment.
    pub async fn wait_for_cleanup(&self) -> bool {
        for _ in 0..50 {
            if self.transient_files().is_empty() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}
