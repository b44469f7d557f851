//! Mock provider implementation for tests and offline runs.

use super::{GenerationRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Echo the prompt back.
    Echo,
    /// Fixed assessment text.
    Text(String),
    /// A successful response carrying no text.
    Empty,
    /// Fail every call with this error.
    Fail(ProviderError),
    /// Sleep before echoing; used to exercise the generation deadline.
    Stall(Duration),
}

/// Mock text provider.
pub struct MockTextProvider {
    reply: MockReply,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockTextProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockReply::Echo)
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockReply::Fail(error))
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }

    fn response(text: Option<String>, prompt: &str) -> ProviderResponse {
        ProviderResponse {
            output_tokens: text.as_ref().map(|t| t.len() as i32 / 4).unwrap_or(0),
            text,
            input_tokens: prompt.len() as i32 / 4,
        }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match &self.reply {
            MockReply::Echo => Ok(Self::response(
                Some(format!("Mock response for: {}", request.prompt)),
                &request.prompt,
            )),
            MockReply::Text(text) => Ok(Self::response(Some(text.clone()), &request.prompt)),
            MockReply::Empty => Ok(Self::response(None, &request.prompt)),
            MockReply::Fail(error) => Err(error.clone()),
            MockReply::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Self::response(
                    Some(format!("Mock response for: {}", request.prompt)),
                    &request.prompt,
                ))
            }
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.reply {
            MockReply::Fail(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
