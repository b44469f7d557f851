//! Text generation provider abstractions and implementations.
//!
//! The pipeline only sees [`TextProvider`]; which backend sits behind it
//! (OpenAI, Gemini, or the in-process mock) is decided once at startup.

pub mod gemini;
pub mod mock;
pub mod openai;

use crate::config::{GenerationConfig, ProviderKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited or quota exceeded: {0}")]
    RateLimited(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Generation timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant.
    pub(crate) fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        let message = format!("{} API error {}: {}", provider, status, body);
        match status.as_u16() {
            401 | 403 => ProviderError::Unauthorized(message),
            429 => ProviderError::RateLimited(message),
            _ => ProviderError::ApiError(message),
        }
    }
}

/// Result of a provider response.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Generated text; `None` when the upstream returned no text part.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,
}

/// Generation parameters for AI requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,
}

/// One generation request: a system instruction plus the user prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Trait for text generation providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a complete text response.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<ProviderResponse, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Short backend name used in logs and `/health`.
    fn name(&self) -> &'static str;
}

/// Build the provider selected by configuration.
pub fn build_provider(config: &GenerationConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    let provider: Arc<dyn TextProvider> = match config.provider {
        ProviderKind::OpenAi => Arc::new(openai::OpenAiTextProvider::new(
            openai::OpenAiConfig::from(config),
        )?),
        ProviderKind::Gemini => Arc::new(gemini::GeminiTextProvider::new(
            gemini::GeminiConfig::from(config),
        )?),
        ProviderKind::Mock => Arc::new(mock::MockTextProvider::echo()),
    };

    Ok(provider)
}

/// Transport failure without the request URL, which may carry credentials
/// or internal hostnames.
pub(crate) fn network_error(err: reqwest::Error) -> ProviderError {
    ProviderError::NetworkError(err.without_url().to_string())
}

/// Shared reqwest client for the HTTP-backed providers.
///
/// The pipeline enforces the overall generation deadline; the client only
/// bounds connection setup.
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}
