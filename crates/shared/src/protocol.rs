use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{PredictionCategory, PredictionId};

/// Multipart field carrying the image on `POST /predict`.
pub const PREDICT_IMAGE_FIELD: &str = "image";

/// Body of `POST /save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePredictionRequest {
    pub label: String,
    pub confidence: f64,
    pub image_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub api_version: String,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

/// One persisted prediction as listed by `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: PredictionId,
    pub label: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default)]
    pub image_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl HistoryRecord {
    pub fn category(&self) -> PredictionCategory {
        PredictionCategory::from_label(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total_predictions: u64,
    pub cimex_detected: u64,
    pub non_cimex: u64,
    pub uncertain: u64,
}
