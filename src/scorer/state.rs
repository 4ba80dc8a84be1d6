use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::element::ElementVector;

pub const DEFAULT_LEARNING_RATE: f64 = 0.06;
pub const DEFAULT_EMA_ACCURACY: f64 = 0.5;
pub const DEFAULT_EMA_ALPHA: f64 = 0.2;

/// Persistent scorer state. Field names on disk follow the snapshot format:
/// `weights`, `bias`, `lr`, `ema_acc`, `ema_alpha`, `days_seen`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub weights: ElementVector,
    pub bias: f64,
    #[serde(rename = "lr")]
    pub learning_rate: f64,
    #[serde(rename = "ema_acc")]
    pub ema_accuracy: f64,
    pub ema_alpha: f64,
    pub days_seen: u64,
}

impl Default for ModelState {
    fn default() -> Self {
        Self::fresh(DEFAULT_LEARNING_RATE, DEFAULT_EMA_ALPHA)
    }
}

impl ModelState {
    /// Zero weights and bias with the given fixed hyperparameters.
    pub fn fresh(learning_rate: f64, ema_alpha: f64) -> Self {
        Self {
            weights: ElementVector::default(),
            bias: 0.0,
            learning_rate,
            ema_accuracy: DEFAULT_EMA_ACCURACY,
            ema_alpha,
            days_seen: 0,
        }
    }
}

/// Returns `Ok(None)` when no snapshot exists yet. A snapshot that exists but
/// cannot be read or parsed is an error; learned weights are never silently
/// discarded.
pub fn load_model_state_from_path(path: &Path) -> Result<Option<ModelState>> {
    if !path.exists() {
        return Ok(None);
    }

    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state: ModelState = serde_json::from_str(&payload)
        .with_context(|| format!("failed to parse model state json {}", path.display()))?;
    Ok(Some(state))
}

/// Load the snapshot, or start fresh with the given hyperparameters.
pub fn load_or_default(path: &Path, learning_rate: f64, ema_alpha: f64) -> Result<ModelState> {
    match load_model_state_from_path(path)? {
        Some(state) => {
            tracing::info!(
                path = %path.display(),
                days_seen = state.days_seen,
                ema_acc = state.ema_accuracy,
                "Loaded model state"
            );
            Ok(state)
        }
        None => {
            tracing::info!(path = %path.display(), "No model state found, starting fresh");
            Ok(ModelState::fresh(learning_rate, ema_alpha))
        }
    }
}

pub fn persist_model_state_to_path(path: &Path, state: &ModelState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let json =
        serde_json::to_string_pretty(state).context("failed to serialize model state json")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), days_seen = state.days_seen, "Persisted model state");
    Ok(())
}
