use std::{fs, io::ErrorKind, path::Path};

use anyhow::Context;
use client_core::{api::DEFAULT_HISTORY_LIMIT, DEFAULT_API_URL};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "detector.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub history_limit: u32,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    history_limit: Option<u32>,
    log_filter: Option<String>,
}

/// Defaults, then the config file, then the process environment.
/// An explicitly named config file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(raw) => {
                if let Err(err) = apply_file(&mut settings, &raw) {
                    warn!("ignoring malformed {DEFAULT_CONFIG_FILE}: {err:#}");
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("could not read {DEFAULT_CONFIG_FILE}: {err}"),
        },
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.history_limit {
        settings.history_limit = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("VITE_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = non_empty("API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = non_empty("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = non_empty("APP__HISTORY_LIMIT") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.history_limit = parsed,
            Err(_) => warn!("ignoring invalid APP__HISTORY_LIMIT={v}"),
        }
    }

    if let Some(v) = non_empty("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
