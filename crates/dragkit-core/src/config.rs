//! Runtime configuration for drag sources and recognizers.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pointer travel, in logical pixels along either axis, before a press turns into a drag.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 5.0;

/// Environment variable overriding the drag threshold.
pub const DRAG_THRESHOLD_ENV: &str = "DRAGKIT_DRAG_THRESHOLD";

/// Failure to load a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Drag-and-drop settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DndConfig {
    /// Gesture threshold override. `None` defers to the platform.
    pub drag_threshold: Option<f64>,
}

impl DndConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let drag_threshold = std::env::var(DRAG_THRESHOLD_ENV)
            .ok()
            .and_then(|raw| parse_threshold(&raw));
        Self { drag_threshold }
    }

    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        if let Some(threshold) = config.drag_threshold {
            if !(threshold.is_finite() && threshold > 0.0) {
                log::warn!("Ignoring drag threshold {} from config", threshold);
                config.drag_threshold = None;
            }
        }
        Ok(config)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the effective threshold given what the platform reports.
    pub fn resolve_threshold(&self, platform: Option<f64>) -> f64 {
        self.drag_threshold
            .or(platform.filter(|t| t.is_finite() && *t > 0.0))
            .unwrap_or(DEFAULT_DRAG_THRESHOLD)
    }
}

fn parse_threshold(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Some(value),
        _ => {
            log::warn!("Ignoring {}={:?}: expected a positive number", DRAG_THRESHOLD_ENV, raw);
            None
        }
    }
}
