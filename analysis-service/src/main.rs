use analysis_service::config::AnalysisConfig;
use analysis_service::services::init_metrics;
use analysis_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AnalysisConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "analysis-service",
        &config.observability.log_level,
        config.observability.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        watsonx_configured = config.watsonx.is_configured(),
        models = config.models.len(),
        "Starting Medical Image Analysis API"
    );
    tracing::info!(
        "Endpoints: GET /api/health, POST /api/analyze, POST /api/chat, GET /api/models, GET /metrics"
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
