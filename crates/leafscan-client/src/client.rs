//! Inference service HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use leafscan_models::{LiveDetection, LiveFrameRequest, PredictResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::types::{ErrorBody, ImageUpload, LiveFrame, StillPrediction};

/// Multipart field carrying the uploaded image.
const IMAGE_FIELD: &str = "image";

/// Longest error body echoed back into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Configuration for the inference client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the inference service
    pub base_url: String,
    /// Path of the multipart still-image endpoint
    pub predict_path: String,
    /// Path of the JSON live-frame endpoint
    pub live_path: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for still-image submissions
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            predict_path: "/api/predict/".to_string(),
            live_path: "/api/livedetect/".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("LEAFSCAN_API_URL").unwrap_or(defaults.base_url),
            predict_path: std::env::var("LEAFSCAN_PREDICT_PATH").unwrap_or(defaults.predict_path),
            live_path: std::env::var("LEAFSCAN_LIVE_PATH").unwrap_or(defaults.live_path),
            timeout: Duration::from_secs(
                std::env::var("LEAFSCAN_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("LEAFSCAN_API_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    fn endpoint(&self, path: &str) -> ClientResult<String> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidConfig(format!("{}: {}", self.base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "unsupported scheme: {}",
                base.scheme()
            )));
        }
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// The inference collaborator as seen by the detector.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Submit one still image.
    async fn predict_image(&self, upload: ImageUpload) -> ClientResult<StillPrediction>;

    /// Submit one live camera frame.
    async fn live_detect(&self, frame: LiveFrame) -> ClientResult<LiveDetection>;
}

/// HTTP client for the inference service.
pub struct InferenceClient {
    http: Client,
    config: ClientConfig,
    predict_url: String,
    live_url: String,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let predict_url = config.endpoint(&config.predict_path)?;
        let live_url = config.endpoint(&config.live_path)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http,
            config,
            predict_url,
            live_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check whether the service answers at all. Any non-5xx status counts.
    pub async fn health_check(&self) -> ClientResult<bool> {
        let url = self.config.endpoint("")?;

        match self.http.get(&url).send().await {
            Ok(response) if !response.status().is_server_error() => Ok(true),
            Ok(response) => {
                warn!("Inference service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Inference service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Inference request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl InferenceService for InferenceClient {
    async fn predict_image(&self, upload: ImageUpload) -> ClientResult<StillPrediction> {
        debug!(
            url = %self.predict_url,
            file = %upload.file_name,
            bytes = upload.bytes.len(),
            "Submitting still image"
        );

        let started = Instant::now();
        let response = self
            .with_retry(|| async {
                let part = Part::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.mime)?;
                let form = Form::new().part(IMAGE_FIELD, part);
                let response = self.http.post(&self.predict_url).multipart(form).send().await?;
                ensure_success(response).await
            })
            .await?;

        let body: PredictResponse = parse_json(response).await?;
        Ok(StillPrediction {
            result: body.predictions,
            elapsed: started.elapsed(),
        })
    }

    async fn live_detect(&self, frame: LiveFrame) -> ClientResult<LiveDetection> {
        let request = LiveFrameRequest {
            frame: frame.data_url,
        };

        let response = self.http.post(&self.live_url).json(&request).send().await?;
        let response = ensure_success(response).await?;
        parse_json(response).await
    }
}

/// Turn a non-2xx response into `ClientError::Status`, surfacing the
/// service's `{ "error": ... }` message when present.
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(MAX_ERROR_BODY).collect())
        });

    if status.as_u16() == 503 {
        return Err(ClientError::ServiceUnavailable(
            detail.unwrap_or_else(|| status.to_string()),
        ));
    }
    Err(ClientError::status(status.as_u16(), detail))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_join() {
        let config = ClientConfig {
            base_url: "http://example.com:8000/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint(&config.live_path).unwrap(),
            "http://example.com:8000/api/livedetect/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            InferenceClient::new(config),
            Err(ClientError::InvalidConfig(_))
        ));
    }
}
