//! Application startup and lifecycle management.

use crate::config::AssessmentConfig;
use crate::handlers;
use crate::pipeline::ReportPipeline;
use crate::services::{build_provider, TextProvider};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "assessment-service";

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AssessmentConfig,
    pub provider: Arc<dyn TextProvider>,
    pub pipeline: ReportPipeline,
}

/// Build the HTTP router: report endpoints, health checks, metrics, and the static
/// front-end as fallback.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.report.body_limit_bytes;
    let static_dir = state.config.report.static_dir.clone();

    let mut app = Router::new()
        .route("/generate-pdf", post(handlers::reports::generate_report))
        .route("/generate-report", post(handlers::reports::generate_report))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the provider selected by configuration.
    pub async fn build(config: AssessmentConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config.generation).map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize generation provider");
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: AssessmentConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.report.temp_dir)
            .await
            .map_err(|e| {
                tracing::error!(
                    temp_dir = %config.report.temp_dir.display(),
                    error = %e,
                    "Failed to prepare report temp directory"
                );
                AppError::from(e)
            })?;

        tracing::info!(
            provider = provider.name(),
            model = %config.generation.model,
            input_mode = ?config.report.input_mode,
            timeout_secs = config.generation.timeout_secs,
            "Initialized report pipeline"
        );

        let state = AppState {
            pipeline: ReportPipeline::from_config(provider.clone(), &config),
            provider,
            config: config.clone(),
        };

        // Port 0 binds a random port for tests
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Assessment service listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
