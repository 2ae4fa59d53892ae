//! Background-removal engine client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Maximum length of an upstream error body carried into our own error.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Engine client configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the rembg-compatible engine (no trailing slash).
    pub base_url: String,
    /// Request timeout. Removal is CPU-heavy upstream, so this is generous.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl EngineConfig {
    /// Create config from environment variables. `REMBG_URL` is required.
    pub fn from_env() -> EngineResult<Self> {
        let base_url = std::env::var("REMBG_URL")
            .map_err(|_| EngineError::config("REMBG_URL must be set"))?;

        if base_url.is_empty() {
            return Err(EngineError::config("REMBG_URL cannot be empty"));
        }

        let timeout_secs: u64 = std::env::var("REMBG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(5),
        })
    }
}

/// HTTP client for the background-removal engine.
#[derive(Clone)]
pub struct EngineClient {
    http: Client,
    removal_url: String,
    base_url: String,
}

impl EngineClient {
    /// Create a new engine client.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("cutout-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EngineError::Network)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let removal_url = format!("{}/api/remove", base_url);

        Ok(Self {
            http,
            removal_url,
            base_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Remove the background from an image.
    ///
    /// Sends the raw bytes to the engine with mask post-processing enabled
    /// and returns the resulting PNG bytes.
    pub async fn remove_background(&self, image: &[u8]) -> EngineResult<Vec<u8>> {
        debug!(bytes = image.len(), "Sending image to removal engine");

        let part = Part::bytes(image.to_vec()).file_name("image");
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&self.removal_url)
            .query(&[("ppm", "true")])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(MAX_ERROR_BODY_LEN);
            return Err(EngineError::removal_failed(format!(
                "engine returned {}: {}",
                status, body
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Lightweight reachability probe used by the readiness endpoint.
    pub async fn check_connectivity(&self) -> EngineResult<()> {
        let response = self.http.get(&self.base_url).send().await?;
        let status = response.status();

        // Anything short of a server error means the engine is reachable.
        if status.is_server_error() {
            Err(EngineError::removal_failed(format!(
                "engine unhealthy: {}",
                status
            )))
        } else {
            Ok(())
        }
    }
}
