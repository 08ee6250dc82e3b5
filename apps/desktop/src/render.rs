//! Text rendering of results, history and backend summaries.

use std::fmt::Write as _;

use client_core::{
    presentation::{advice, confidence_percent, headline, probability_percent},
    Notice, NoticeLevel, SessionHistory,
};
use shared::{
    domain::{PredictionCategory, PredictionResult},
    error::WorkflowError,
    protocol::{HealthStatus, HistoryRecord, PredictionStats},
};

const BAR_WIDTH: usize = 20;

fn marker(category: PredictionCategory) -> &'static str {
    match category {
        PredictionCategory::Positive => "[!]",
        PredictionCategory::Negative => "[ok]",
        PredictionCategory::Uncertain => "[?]",
    }
}

pub fn percent_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn result_card(image_name: &str, result: &PredictionResult) -> String {
    let category = result.category();
    let probability = probability_percent(result.probability);
    let mut out = String::new();
    let _ = writeln!(out, "{} {}  ({image_name})", marker(category), headline(category));
    let _ = writeln!(
        out,
        "    Confidence:  {}%",
        confidence_percent(result.confidence)
    );
    let _ = writeln!(
        out,
        "    Probability: {} {probability}%",
        percent_bar(probability)
    );
    let _ = writeln!(out, "    Label:       {}", result.label);
    let _ = write!(out, "    {}", advice(category));
    out
}

pub fn session_history(history: &SessionHistory) -> String {
    if history.is_empty() {
        return "No predictions yet.".to_string();
    }
    let mut out = String::from("Recent Predictions");
    for entry in history.iter() {
        let _ = write!(
            out,
            "\n  {} {:<4} {:<28} {:<10} {:>3}%",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            marker(entry.result.category()),
            entry.image_name,
            entry.result.label,
            confidence_percent(entry.result.confidence)
        );
    }
    out
}

pub fn backend_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No saved predictions.".to_string();
    }
    let mut out = String::from("Saved Predictions");
    for record in records {
        let _ = write!(
            out,
            "\n  #{:<5} {} {:<4} {:<28} {:<10} {:>3}%",
            record.id.0,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            marker(record.category()),
            record.image_name.as_deref().unwrap_or("Unknown"),
            record.label,
            confidence_percent(record.confidence)
        );
    }
    out
}

pub fn stats(stats: &PredictionStats) -> String {
    format!(
        "Total predictions: {}\n  Bedbugs detected: {}\n  No bedbug:        {}\n  Uncertain:        {}",
        stats.total_predictions, stats.cimex_detected, stats.non_cimex, stats.uncertain
    )
}

pub fn health(base_url: &str, health: &HealthStatus) -> String {
    format!(
        "{base_url}: {} (model loaded: {}, api {})",
        health.status,
        if health.model_loaded { "yes" } else { "no" },
        health.api_version
    )
}

pub fn notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => format!("✓ {}", notice.message),
        NoticeLevel::Error => format!("✗ {}", notice.message),
    }
}

/// Extra guidance printed under a failure notice, when there is any.
pub fn failure_hint(err: &WorkflowError) -> Option<String> {
    let WorkflowError::PredictionFailed(message) = err else {
        return None;
    };
    let lower = message.to_ascii_lowercase();
    if lower.contains("connection refused")
        || lower.contains("error sending request")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        Some("Detector API unreachable; check --api-url or API_URL and retry.".to_string())
    } else if lower.contains("only jpg or png") {
        Some("The detector only accepts JPG or PNG images.".to_string())
    } else {
        Some(format!("Detector API error: {message}"))
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
