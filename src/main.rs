use std::sync::Arc;

use anyhow::Result;

use blueprint_estimator::services::{
    DocxArchiveDecoder, ModelClient, PdfExtractDecoder, TextGenerator,
};
use blueprint_estimator::{app, config, logging, pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting blueprint estimator"
    );

    // Create the model service client
    let model: Arc<dyn TextGenerator> = Arc::new(ModelClient::new(
        &settings.model_service_url,
        &settings.model_service_token,
        settings.model_service_timeout_seconds,
    )?);

    // Optionally check model service health (non-blocking)
    tokio::spawn({
        let model = model.clone();
        async move {
            match model.health_check().await {
                Ok(()) => tracing::info!("Model service is healthy"),
                Err(e) => tracing::warn!(error = %e, "Model service health check failed - will retry on first request"),
            }
        }
    });

    // Wire up the extraction pipeline
    let estimate_pipeline = pipeline::EstimatePipeline::new(
        model.clone(),
        Arc::new(PdfExtractDecoder),
        Arc::new(DocxArchiveDecoder::new()),
    );

    // Create application state
    let state = app::AppState::new(settings.clone(), estimate_pipeline, model);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
