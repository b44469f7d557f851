use crate::startup::{AppState, SERVICE_NAME};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness: the process is up and serving.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider.name(),
    }))
}

/// Readiness: the generation backend is reachable with the configured
/// credential.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.provider.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(
                provider = state.provider.name(),
                error = %e,
                "Readiness check failed"
            );
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    service_core::observability::get_metrics()
}
