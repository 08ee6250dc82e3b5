//! Pure helpers used when rendering a prediction.

use shared::domain::PredictionCategory;

pub fn classify(label: &str) -> PredictionCategory {
    PredictionCategory::from_label(label)
}

/// `value * 100` rounded to the nearest integer. Values outside `[0, 1]` are
/// clamped first and NaN renders as 0.
pub fn confidence_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn probability_percent(value: f64) -> u8 {
    confidence_percent(value)
}

pub fn headline(category: PredictionCategory) -> &'static str {
    match category {
        PredictionCategory::Positive => "Bedbug Detected",
        PredictionCategory::Negative => "No Bedbug",
        PredictionCategory::Uncertain => "Uncertain",
    }
}

pub fn advice(category: PredictionCategory) -> &'static str {
    match category {
        PredictionCategory::Positive => {
            "This image shows characteristics consistent with bedbugs. Consult a professional for confirmation and treatment."
        }
        PredictionCategory::Negative => {
            "This image does not show bedbugs. However, if you suspect an infestation, consult a professional."
        }
        PredictionCategory::Uncertain => {
            "The analysis is uncertain. Please provide a clearer image or consult a professional."
        }
    }
}
