use crate::config::AnalysisConfig;
use crate::handlers;
use crate::services::providers::watsonx::WatsonxProvider;
use crate::services::providers::InferenceProvider;
use crate::services::AnalysisOrchestrator;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use service_core::error::{AppError, ErrorBody, GENERIC_INTERNAL_ERROR};
use service_core::middleware::{http_trace_layer, metrics_middleware, request_id_middleware};
use std::any::Any;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

pub struct Application {
    port: u16,
    server: ServerFuture,
    state: AppState,
}

impl Application {
    /// Build against watsonx.ai using the configured credentials.
    pub async fn build(config: AnalysisConfig) -> Result<Self, AppError> {
        let provider = WatsonxProvider::new(config.watsonx.clone()).map_err(|e| {
            tracing::error!("Failed to create watsonx client: {}", e);
            AppError::ConfigError(anyhow::anyhow!("watsonx client: {}", e))
        })?;

        if provider.is_available() {
            tracing::info!(url = %config.watsonx.url, "watsonx.ai client initialized");
        } else {
            tracing::warn!("watsonx.ai credentials missing, analysis endpoints will report not initialized");
        }

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    pub async fn build_with_provider(
        config: AnalysisConfig,
        provider: Arc<dyn InferenceProvider>,
    ) -> Result<Self, AppError> {
        let orchestrator = AnalysisOrchestrator::from_config(&config, provider);

        tracing::info!(
            provider = orchestrator.provider_name(),
            models = ?orchestrator.catalog().iter().map(|m| m.key.as_str()).collect::<Vec<_>>(),
            "Analysis orchestrator ready"
        );

        let state = AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        };

        let app = build_router(state.clone());

        let addr = state.config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::pin(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.max_upload_bytes;

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/analyze", post(handlers::analyze_medical_image))
        .route("/api/chat", post(handlers::chat))
        .route("/api/models", get(handlers::list_models))
        .route("/metrics", get(handlers::metrics_endpoint))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(GENERIC_INTERNAL_ERROR)),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
