//! OpenAI provider implementation.
//!
//! Talks to the Responses API (`POST /v1/responses`) with a system and a user
//! message and collects every `output_text` part of the reply.

use super::{
    http_client, network_error, GenerationRequest, ProviderError, ProviderResponse, TextProvider,
};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl From<&GenerationConfig> for OpenAiConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_BASE.to_string()),
        }
    }
}

/// OpenAI text provider.
pub struct OpenAiTextProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ResponsesRequest<'a> {
        ResponsesRequest {
            model: &self.config.model,
            input: vec![
                InputMessage {
                    role: "system",
                    content: &request.system,
                },
                InputMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.params.temperature,
            max_output_tokens: request.params.max_tokens,
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.ensure_configured()?;

        tracing::debug!(
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            "Sending request to OpenAI Responses API"
        );

        let response = self
            .client
            .post(self.api_url("responses"))
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                "OpenAI",
                status,
                upstream_message(&body),
            ));
        }

        let api_response: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| {
                ProviderError::ApiError(format!("Failed to parse response: {}", e.without_url()))
            })?;

        api_response.into_provider_response()
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.ensure_configured()?;

        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(network_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::from_status(
                "OpenAI",
                response.status(),
                "health check failed".to_string(),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw
/// body text.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: i32,
    #[serde(default)]
    output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl ResponsesResponse {
    fn into_provider_response(self) -> Result<ProviderResponse, ProviderError> {
        let filtered = self.status.as_deref() == Some("incomplete")
            && self
                .incomplete_details
                .as_ref()
                .and_then(|d| d.reason.as_deref())
                == Some("content_filter");
        if filtered {
            return Err(ProviderError::ContentFiltered);
        }

        let text: String = self
            .output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect();

        let usage = self.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text: if text.is_empty() { None } else { Some(text) },
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}
