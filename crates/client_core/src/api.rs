//! HTTP client for the detector API.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::PredictionResult,
    error::ErrorDetail,
    protocol::{
        HealthStatus, HistoryRecord, PredictionStats, SavePredictionRequest, PREDICT_IMAGE_FIELD,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::selection::ImageFile;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("invalid detector api url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request to detector api failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("detector api returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("unexpected detector api response: {0}")]
    Decode(String),
}

/// The two calls the workflow controller makes against the backend.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, ApiClientError>;
    async fn save(&self, request: &SavePredictionRequest) -> Result<(), ApiClientError>;
}

#[derive(Debug, Clone)]
pub struct DetectorApi {
    http: Client,
    base_url: String,
}

impl DetectorApi {
    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, ApiClientError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.mime_type())?;
        let form = Form::new().part(PREDICT_IMAGE_FIELD, part);

        info!(
            image = image.name(),
            size_bytes = image.size(),
            "predict: uploading image"
        );
        let response = self
            .http
            .post(self.endpoint("predict"))
            .multipart(form)
            .send()
            .await?;
        let result: PredictionResult = decode(check_status(response).await?).await?;
        info!(
            image = image.name(),
            label = %result.label,
            confidence = result.confidence,
            "predict: completed"
        );
        Ok(result)
    }

    pub async fn save(&self, request: &SavePredictionRequest) -> Result<(), ApiClientError> {
        let response = self
            .http
            .post(self.endpoint("save"))
            .json(request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiClientError> {
        let response = self.http.get(self.endpoint("health")).send().await?;
        decode(check_status(response).await?).await
    }

    /// Persisted predictions, newest first.
    pub async fn history(&self, limit: u32) -> Result<Vec<HistoryRecord>, ApiClientError> {
        let response = self
            .http
            .get(self.endpoint("history"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        decode(check_status(response).await?).await
    }

    pub async fn stats(&self) -> Result<PredictionStats, ApiClientError> {
        let response = self.http.get(self.endpoint("stats")).send().await?;
        decode(check_status(response).await?).await
    }
}

#[async_trait]
impl PredictionBackend for DetectorApi {
    async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, ApiClientError> {
        DetectorApi::predict(self, image).await
    }

    async fn save(&self, request: &SavePredictionRequest) -> Result<(), ApiClientError> {
        DetectorApi::save(self, request).await
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ApiClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|err| ApiClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiClientError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

async fn check_status(response: Response) -> Result<Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(parsed) => parsed.message(),
        Err(_) if body.trim().is_empty() => status.canonical_reason().unwrap_or("").to_string(),
        Err(_) => body,
    };
    warn!(%status, %detail, "detector api request rejected");
    Err(ApiClientError::Status { status, detail })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ApiClientError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
