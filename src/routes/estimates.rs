//! Estimate extraction endpoint.
//!
//! Thin HTTP wrapper over the Blueprint-to-Estimate pipeline: decode the
//! payload, run the pipeline, serialize the result. The pipeline never
//! errors (a degraded run still returns a well-formed result), so the only
//! failures here are malformed requests.

use axum::{extract::State, http::HeaderMap, Json};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::PipelineResult;
use crate::error::{ApiError, ApiResult};
use crate::middleware::request_id;
use crate::pipeline::UploadedBlueprint;

/// Request payload for blueprint extraction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractEstimateRequest {
    /// Base64 file content, optionally as a data URL.
    pub file_data: String,
    /// Declared format: pdf, docx, dwg, dxf, image, ...
    pub file_type: String,
    #[serde(default)]
    pub project_context: serde_json::Value,
}

/// Run the extraction pipeline on an uploaded blueprint.
///
/// POST /v1/estimates/extract
pub async fn extract_estimate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExtractEstimateRequest>,
) -> ApiResult<Json<PipelineResult>> {
    let content = decode_file_data(&req.file_data)?;

    tracing::info!(
        request_id = request_id(&headers),
        file_type = %req.file_type,
        bytes = content.len(),
        "Blueprint extraction requested"
    );

    let blueprint = UploadedBlueprint::new(content, &req.file_type);
    let result = state.pipeline.run(&blueprint, &req.project_context).await;

    Ok(Json(result))
}

/// Decode base64 content, accepting both bare base64 and data URLs
/// (`data:application/pdf;base64,...`).
fn decode_file_data(file_data: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = match file_data.split_once("base64,") {
        Some((_, rest)) => rest,
        None => file_data,
    };

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("fileData is not valid base64: {e}")))
}
