//! Generative model client.
//!
//! The pipeline consumes the model through the `TextGenerator` trait so the
//! capability is injected at wiring time; `ModelClient` is the production
//! implementation talking HTTP to the internal model service.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// A single generative request: a prompt, optionally grounded on an image.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub image: Option<&'a [u8]>,
}

impl<'a> GenerateRequest<'a> {
    pub fn text(prompt: &'a str) -> Self {
        Self {
            prompt,
            image: None,
        }
    }

    pub fn with_image(prompt: &'a str, image: &'a [u8]) -> Self {
        Self {
            prompt,
            image: Some(image),
        }
    }
}

/// Errors from the generative capability.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model service unavailable: {0}")]
    Unavailable(String),

    #[error("model service returned {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
    },

    #[error("invalid model service response: {0}")]
    InvalidResponse(String),
}

/// Text/vision generation capability. One blocking request per call, no
/// streaming, no internal retry.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> BoxFuture<'a, Result<String, ModelError>>;

    /// Liveness probe; implementations without a backing service report Ok.
    fn health_check(&self) -> BoxFuture<'_, Result<(), ModelError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Error payload from the model service.
#[derive(Debug, Deserialize)]
struct ModelErrorResponse {
    message: String,
}

/// HTTP client for the internal model service.
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ModelClient {
    pub fn new(base_url: &str, token: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Model client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post_generate(&self, request: GenerateRequest<'_>) -> Result<String, ModelError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Request<'a> {
            prompt: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            image_base64: Option<String>,
        }

        #[derive(Deserialize)]
        struct Response {
            text: String,
        }

        let url = format!("{}/v1/generate", self.base_url);
        let body = Request {
            prompt: request.prompt,
            image_base64: request
                .image
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        };

        debug!(url = %url, vision = request.image.is_some(), "Model service request");

        let response = self
            .client
            .post(&url)
            .header("X-Internal-Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Model service request failed");
                ModelError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed: Response = response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
            Ok(parsed.text)
        } else {
            let message = response
                .json::<ModelErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("model service error: {}", status));
            error!(status = %status, message = %message, "Model service error");
            Err(ModelError::Status { status, message })
        }
    }

    async fn ping(&self) -> Result<(), ModelError> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl TextGenerator for ModelClient {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> BoxFuture<'a, Result<String, ModelError>> {
        Box::pin(self.post_generate(request))
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), ModelError>> {
        Box::pin(self.ping())
    }
}
