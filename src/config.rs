use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Model service
    pub model_service_url: String,
    pub model_service_token: String,
    pub model_service_timeout_seconds: u64,

    // Upload limit for blueprint payloads, in bytes
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Model service
        let model_service_url =
            env::var("MODEL_SERVICE_URL").unwrap_or_else(|_| "http://model-service:8000".to_string());
        let model_service_token =
            env::var("MODEL_SERVICE_TOKEN").context("MODEL_SERVICE_TOKEN must be set")?;
        let model_service_timeout_seconds = env::var("MODEL_SERVICE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120); // 2 minutes default for generative calls

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024); // blueprints can be large scans

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            model_service_url,
            model_service_token,
            model_service_timeout_seconds,
            max_upload_bytes,
        })
    }
}
