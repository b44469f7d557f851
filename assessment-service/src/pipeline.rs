//! Request-to-document pipeline.
//!
//! One run per request: normalize the intake, build the prompt, generate the
//! assessment, convert it to plain text and lay it out into a transient PDF.
//! Delivery belongs to the HTTP layer, which takes ownership of the file.

use crate::config::{AssessmentConfig, InputMode};
use crate::error::ReportError;
use crate::intake::Intake;
use crate::prompts::{build_prompt, SYSTEM_PROMPT};
use crate::render::{markdown_to_plain, render_pdf, RenderError, ReportDocument, TransientFile};
use crate::services::providers::{GenerationParams, GenerationRequest};
use crate::services::{ProviderError, TextProvider};
use metrics::{counter, histogram};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const REPORT_TITLE: &str = "Security Assessment Report";

/// First header line in fields mode.
pub const FIELDS_SUBTITLE: &str = "Business Security & Emergency Preparedness Assessment";

/// Body used when the provider answers without any text.
pub const FALLBACK_ASSESSMENT: &str = "Security assessment could not be generated at this time.";

const FIELDS_DOWNLOAD_NAME: &str = "Security_Assessment_Report.pdf";
const TRANSIENT_PREFIX: &str = "security-report";

/// A rendered PDF waiting to be delivered.
#[derive(Debug)]
pub struct RenderedReport {
    pub file: TransientFile,
    /// Filename offered in `Content-Disposition`.
    pub download_name: String,
    pub pages: usize,
}

#[derive(Clone)]
pub struct ReportPipeline {
    provider: Arc<dyn TextProvider>,
    mode: InputMode,
    temp_dir: PathBuf,
    timeout: Duration,
    params: GenerationParams,
}

impl ReportPipeline {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        mode: InputMode,
        temp_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            mode,
            temp_dir,
            timeout,
            params: GenerationParams::default(),
        }
    }

    pub fn from_config(provider: Arc<dyn TextProvider>, config: &AssessmentConfig) -> Self {
        Self::new(
            provider,
            config.report.input_mode,
            config.report.temp_dir.clone(),
            config.generation.timeout(),
        )
        .with_params(config.generation.params())
    }

    /// Sampling parameters sent with every generation request.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Run the whole pipeline for one request body.
    ///
    /// Failures are logged and counted here with their stage, so callers only
    /// have to map them to a response.
    pub async fn run(&self, payload: &Value) -> Result<RenderedReport, ReportError> {
        let started = Instant::now();

        match self.execute(payload).await {
            Ok(report) => {
                counter!("reports_generated_total").increment(1);
                histogram!("report_generation_seconds").record(started.elapsed().as_secs_f64());
                tracing::info!(
                    download_name = %report.download_name,
                    pages = report.pages,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Report rendered"
                );
                Ok(report)
            }
            Err(e) => {
                counter!("report_failures_total", "stage" => e.stage()).increment(1);
                match &e {
                    ReportError::Validation(_) => {
                        tracing::warn!(stage = e.stage(), error = %e, "Report request rejected")
                    }
                    _ => tracing::error!(stage = e.stage(), error = %e, "Report pipeline failed"),
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, payload: &Value) -> Result<RenderedReport, ReportError> {
        let intake = Intake::parse(self.mode, payload)?;
        let prompt = build_prompt(&intake);
        let assessment = self.generate(prompt).await?;

        let document = ReportDocument {
            title: REPORT_TITLE.to_string(),
            header_lines: header_lines(&intake),
            body: markdown_to_plain(&assessment),
        };

        // The guard lives on the blocking task until the render finishes. If
        // this future is dropped meanwhile, tokio drops the task's output and
        // the guard unlinks the finished file.
        let file = TransientFile::reserve(&self.temp_dir, TRANSIENT_PREFIX, "pdf");
        let (file, pages) = tokio::task::spawn_blocking(move || {
            render_pdf(&document, file.path()).map(|pages| (file, pages))
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        Ok(RenderedReport {
            file,
            download_name: self.download_name(),
            pages,
        })
    }

    /// Call the provider under the configured deadline. Missing or blank text
    /// becomes the fallback sentence.
    async fn generate(&self, prompt: String) -> Result<String, ProviderError> {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            params: self.params.clone(),
        };

        let response = tokio::time::timeout(self.timeout, self.provider.generate(&request))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))??;

        tracing::debug!(
            provider = self.provider.name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Assessment generated"
        );

        match response.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                tracing::warn!(
                    provider = self.provider.name(),
                    "Provider returned no text; using fallback assessment"
                );
                Ok(FALLBACK_ASSESSMENT.to_string())
            }
        }
    }

    fn download_name(&self) -> String {
        match self.mode {
            InputMode::Fields => FIELDS_DOWNLOAD_NAME.to_string(),
            InputMode::Answers => format!(
                "{}-{}.pdf",
                TRANSIENT_PREFIX,
                chrono::Utc::now().timestamp_millis()
            ),
        }
    }
}

fn header_lines(intake: &Intake) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    if matches!(intake, Intake::Fields(_)) {
        lines.push(FIELDS_SUBTITLE.to_string());
    }
    if let Some(name) = intake.business_name() {
        lines.push(format!("Business Name: {}", name));
    }
    if let Some(name) = intake.contact_name() {
        lines.push(format!("Contact Name: {}", name));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::{MockReply, MockTextProvider};
    use serde_json::json;

    fn pipeline(
        provider: Arc<MockTextProvider>,
        mode: InputMode,
        dir: &std::path::Path,
    ) -> ReportPipeline {
        ReportPipeline::new(provider, mode, dir.to_path_buf(), Duration::from_secs(5))
    }

    fn dir_entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn fields_request_renders_named_report() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::with_text(
            "## Executive Summary\n- Improve lighting\n",
        ));
        let pipeline = pipeline(provider.clone(), InputMode::Fields, dir.path());

        let report = pipeline
            .run(&json!({
                "businessName": "Acme",
                "contactName": "J. Doe",
                "threatConcerns": "theft",
            }))
            .await
            .unwrap();

        assert_eq!(report.download_name, "Security_Assessment_Report.pdf");
        assert_eq!(report.pages, 1);
        assert!(report.file.path().starts_with(dir.path()));
        let bytes = std::fs::read(report.file.path()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Acme"));
        assert!(prompts[0].contains("J. Doe"));
        assert!(prompts[0].contains("theft"));

        drop(report);
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn answers_request_gets_timestamped_download_name() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::with_text("Risk Summary\nLow"));
        let pipeline = pipeline(provider, InputMode::Answers, dir.path());

        let report = pipeline
            .run(&json!({ "answers": { "businessName": "Acme Depot" } }))
            .await
            .unwrap();

        let name = &report.download_name;
        assert!(name.starts_with("security-report-"), "got {}", name);
        assert!(name.ends_with(".pdf"));
        assert!(name["security-report-".len()..name.len() - 4]
            .chars()
            .all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn missing_answers_is_rejected_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::echo());
        let pipeline = pipeline(provider.clone(), InputMode::Answers, dir.path());

        let err = pipeline.run(&json!({})).await.unwrap_err();

        assert!(matches!(err, ReportError::Validation(ref msg) if msg == "Missing 'answers' field"));
        assert!(provider.prompts().is_empty());
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::failing(ProviderError::RateLimited(
            "quota exceeded".into(),
        )));
        let pipeline = pipeline(provider, InputMode::Fields, dir.path());

        let err = pipeline.run(&json!({})).await.unwrap_err();

        assert_eq!(err.stage(), "generation");
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn empty_generation_uses_fallback_text() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::new(MockReply::Empty));
        let pipeline = pipeline(provider, InputMode::Fields, dir.path());

        let text = pipeline.generate("prompt".into()).await.unwrap();
        assert_eq!(text, FALLBACK_ASSESSMENT);

        let report = pipeline.run(&json!({})).await.unwrap();
        assert!(report.file.path().exists());
    }

    #[tokio::test]
    async fn whitespace_generation_uses_fallback_text() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::with_text("  \n\t "));
        let pipeline = pipeline(provider, InputMode::Fields, dir.path());

        assert_eq!(
            pipeline.generate("prompt".into()).await.unwrap(),
            FALLBACK_ASSESSMENT
        );
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::new(MockReply::Stall(Duration::from_secs(5))));
        let pipeline = ReportPipeline::new(
            provider,
            InputMode::Fields,
            dir.path().to_path_buf(),
            Duration::from_millis(50),
        );

        let err = pipeline.run(&json!({})).await.unwrap_err();

        assert!(matches!(
            err,
            ReportError::Generation(ProviderError::Timeout(_))
        ));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn unwritable_temp_dir_is_a_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let provider = Arc::new(MockTextProvider::with_text("text"));
        let pipeline = pipeline(provider, InputMode::Fields, &missing);

        let err = pipeline.run(&json!({})).await.unwrap_err();

        assert_eq!(err.stage(), "render");
        assert!(matches!(err, ReportError::Render(RenderError::Io(_))));
    }

    #[tokio::test]
    async fn concurrent_runs_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::with_text("text"));
        let pipeline = pipeline(provider, InputMode::Fields, dir.path());

        let payload = json!({ "businessName": "Acme" });
        let (a, b) = tokio::join!(pipeline.run(&payload), pipeline.run(&payload));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.file.path(), b.file.path());
        assert_eq!(dir_entries(dir.path()), 2);
    }

    #[tokio::test]
    async fn configured_params_reach_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockTextProvider::with_text("text"));
        let pipeline = pipeline(provider.clone(), InputMode::Fields, dir.path()).with_params(
            GenerationParams {
                temperature: Some(0.3),
                max_tokens: Some(1200),
            },
        );

        pipeline.run(&json!({})).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].system, SYSTEM_PROMPT);
        assert_eq!(requests[0].params.temperature, Some(0.3));
        assert_eq!(requests[0].params.max_tokens, Some(1200));
    }

    #[tokio::test]
    async fn cancelled_run_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        // Long enough that the render is still on the blocking pool when the
        // caller gives up.
        let body = (0..20_000)
            .map(|i| format!("Finding {} with a recommendation to review access control", i))
            .collect::<Vec<_>>()
            .join("\n");
        let provider = Arc::new(MockTextProvider::with_text(body));
        let pipeline = pipeline(provider.clone(), InputMode::Fields, dir.path());

        let outcome = tokio::time::timeout(Duration::from_millis(50), pipeline.run(&json!({}))).await;
        if let Ok(report) = outcome {
            drop(report);
        }
        assert_eq!(provider.prompts().len(), 1);

        let mut remaining = dir_entries(dir.path());
        for _ in 0..600 {
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            remaining = dir_entries(dir.path());
        }
        assert_eq!(remaining, 0, "abandoned render left a file in the temp dir");
    }

    #[test]
    fn header_lines_follow_mode_and_names() {
        let fields = Intake::parse(
            InputMode::Fields,
            &json!({ "businessName": "Acme", "contactName": "" }),
        )
        .unwrap();
        assert_eq!(
            header_lines(&fields),
            vec![FIELDS_SUBTITLE.to_string(), "Business Name: Acme".to_string()]
        );

        let answers = Intake::parse(
            InputMode::Answers,
            &json!({ "answers": { "contactName": "J. Doe" } }),
        )
        .unwrap();
        assert_eq!(header_lines(&answers), vec!["Contact Name: J. Doe".to_string()]);

        let bare = Intake::parse(InputMode::Answers, &json!({ "answers": [] })).unwrap();
        assert!(header_lines(&bare).is_empty());
    }
}
