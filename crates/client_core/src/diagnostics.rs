use shared::protocol::SavePredictionRequest;
use tracing::{debug, warn};

use crate::api::ApiClientError;

/// Sink for failures that are never shown to the user.
pub trait Diagnostics: Send + Sync {
    fn persistence_failed(&self, request: &SavePredictionRequest, error: &ApiClientError);

    fn persistence_succeeded(&self, _request: &SavePredictionRequest) {}

    fn stale_outcome_discarded(&self, _outcome_generation: u64, _current_generation: u64) {}
}

pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn persistence_failed(&self, request: &SavePredictionRequest, error: &ApiClientError) {
        warn!(
            image = %request.image_name,
            label = %request.label,
            "could not save prediction: {error}"
        );
    }

    fn persistence_succeeded(&self, request: &SavePredictionRequest) {
        debug!(image = %request.image_name, "prediction saved");
    }

    fn stale_outcome_discarded(&self, outcome_generation: u64, current_generation: u64) {
        debug!(
            outcome_generation,
            current_generation, "discarding prediction outcome for superseded request"
        );
    }
}
