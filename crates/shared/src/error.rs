use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MAX_IMAGE_BYTES;

/// Error body returned by the detector API on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Failures the workflow reports back to the user. None of them end the
/// session; the user can always retry or clear.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("unsupported file type '{mime_type}' for {name}")]
    InvalidType { name: String, mime_type: String },
    #[error("{name} is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("no image selected")]
    NoSelection,
    #[error("prediction failed: {0}")]
    PredictionFailed(String),
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl WorkflowError {
    pub fn too_large(name: impl Into<String>, size: u64) -> Self {
        Self::TooLarge {
            name: name.into(),
            size,
            limit: MAX_IMAGE_BYTES,
        }
    }

    /// Short text suitable for a transient notification.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::InvalidType { .. } => "Please select a valid image file",
            Self::TooLarge { .. } => "Image size must be less than 5MB",
            Self::NoSelection => "Please select an image first",
            Self::PredictionFailed(_) => "Failed to process image. Please try again.",
            Self::Unreadable { .. } => "Could not read the selected file",
        }
    }
}
