use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest image accepted for upload, inclusive.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// MIME prefix every accepted upload must carry.
pub const IMAGE_MIME_PREFIX: &str = "image/";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PredictionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionCategory {
    Positive,
    Negative,
    Uncertain,
}

/// Raw backend labels and the category each one denotes. Matching ignores
/// ASCII case and surrounding whitespace.
pub const LABEL_TABLE: &[(&str, PredictionCategory)] = &[
    ("cimex", PredictionCategory::Positive),
    ("culex", PredictionCategory::Positive),
    ("non-cimex", PredictionCategory::Negative),
    ("non-culex", PredictionCategory::Negative),
    ("uncertain", PredictionCategory::Uncertain),
];

impl PredictionCategory {
    /// Maps a backend label to its category. Labels missing from
    /// [`LABEL_TABLE`] are treated as [`PredictionCategory::Uncertain`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        LABEL_TABLE
            .iter()
            .find(|(raw, _)| raw.eq_ignore_ascii_case(label))
            .map(|(_, category)| *category)
            .unwrap_or(PredictionCategory::Uncertain)
    }

    pub fn is_detection(self) -> bool {
        self == PredictionCategory::Positive
    }
}

/// Outcome of one classification request. Fields beyond these three are
/// dropped when decoding the backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub probability: f64,
    pub confidence: f64,
}

impl PredictionResult {
    pub fn category(&self) -> PredictionCategory {
        PredictionCategory::from_label(&self.label)
    }
}

/// A result as recorded in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub image_name: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(result: PredictionResult, image_name: impl Into<String>) -> Self {
        Self {
            result,
            image_name: image_name.into(),
            created_at: Utc::now(),
        }
    }
}
