use crate::render::RenderError;
use crate::services::ProviderError;
use service_core::error::AppError;
use thiserror::Error;

/// Failures of a single report request, by pipeline stage.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Rejected before any external call.
    #[error("{0}")]
    Validation(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}

impl ReportError {
    /// Stage label used in logs and the `report_failures_total` metric.
    pub fn stage(&self) -> &'static str {
        match self {
            ReportError::Validation(_) => "validation",
            ReportError::Generation(_) => "generation",
            ReportError::Render(_) => "render",
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ReportError::Generation(e) => AppError::ProcessingFailed {
                error: "AI generation error".to_string(),
                details: e.to_string(),
            },
            ReportError::Render(e) => AppError::ProcessingFailed {
                error: "PDF render error".to_string(),
                details: e.to_string(),
            },
        }
    }
}
