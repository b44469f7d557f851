use crate::error::ReportError;
use crate::pipeline::RenderedReport;
use crate::render::RenderError;
use crate::startup::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use service_core::error::AppError;

/// `POST /generate-pdf` and `POST /generate-report`.
///
/// Runs the report pipeline for the request body and streams the PDF back as
/// an attachment. The transient file is removed once the body is done.
pub async fn generate_report(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let body = body.map_err(body_rejection)?;
    let payload = parse_payload(&body)?;
    let report = state.pipeline.run(&payload).await?;
    deliver(report).await
}

/// Body read failures keep the `{error, details}` shape. Exceeding the body
/// limit is a 413, anything else a 400.
fn body_rejection(rejection: BytesRejection) -> AppError {
    let status = rejection.status();
    let details = rejection.body_text();
    tracing::warn!(status = status.as_u16(), error = %details, "Failed to read report request body");

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(details)
    } else {
        AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", details))
    }
}

/// An empty body counts as `{}`.
fn parse_payload(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed report request body");
        AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e))
    })
}

async fn deliver(report: RenderedReport) -> Result<Response, AppError> {
    let RenderedReport {
        file,
        download_name,
        ..
    } = report;

    let (len, stream) = file.into_stream().await.map_err(|e| {
        tracing::error!(stage = "render", error = %e, "Failed to open rendered report");
        AppError::from(ReportError::Render(RenderError::from(e)))
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(parse_payload(b"").unwrap(), Value::Object(Map::new()));
        assert_eq!(parse_payload(b" \n").unwrap(), Value::Object(Map::new()));
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = parse_payload(b"{\"businessName\":").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Invalid JSON body"));
    }

    #[test]
    fn any_json_value_is_accepted() {
        assert_eq!(parse_payload(b"[1]").unwrap(), serde_json::json!([1]));
    }
}
