use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::NewsdeskError;

/// TOML-backed configuration loaded from disk.
/// Secrets (API keys, DB URL) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub models: ModelsConfig,
    #[serde(default)]
    pub dedup: DedupSettings,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    pub dedup: String,
}

/// Paths are relative to the directory holding the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    pub dedup_system: PathBuf,
    pub dedup_user: PathBuf,
}

/// Tuning for cross-source duplicate detection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupSettings {
    /// Minimum oracle confidence for a duplicate verdict to become an edge.
    pub confidence_threshold: f64,
    /// Width of a temporal group, measured from its first (anchor) article.
    pub time_window_hours: i64,
    /// Comparisons in flight per chunk.
    pub max_concurrent: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            time_window_hours: 48,
            max_concurrent: 10,
        }
    }
}

impl DedupSettings {
    pub fn validate(&self) -> Result<(), NewsdeskError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(NewsdeskError::Config(format!(
                "dedup.confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.time_window_hours <= 0 {
            return Err(NewsdeskError::Config(format!(
                "dedup.time_window_hours must be positive, got {}",
                self.time_window_hours
            )));
        }
        if self.checked_time_window().is_none() {
            return Err(NewsdeskError::Config(format!(
                "dedup.time_window_hours is too large, got {}",
                self.time_window_hours
            )));
        }
        if self.max_concurrent == 0 {
            return Err(NewsdeskError::Config(
                "dedup.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn checked_time_window(&self) -> Option<chrono::TimeDelta> {
        chrono::TimeDelta::try_hours(self.time_window_hours)
    }

    /// Window as a duration. Saturates for settings `validate` rejects.
    pub fn time_window(&self) -> chrono::TimeDelta {
        self.checked_time_window().unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Load and parse a TOML config file. Range checks on `[dedup]` happen
/// where the settings are consumed, see [`DedupSettings::validate`].
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
