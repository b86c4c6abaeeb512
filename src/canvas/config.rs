use crate::error::PersistenceError;
use crate::remap::RemapStrategy;
use crate::watcher::EmissionGuard;
use serde::{Deserialize, Serialize};
use std::fs;

/// Canvas-wide settings. Every field has a default, so a partial JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Remap strategy for cards that do not choose their own.
    pub strategy: RemapStrategy,
    /// Recompute connection geometry on the next tick instead of immediately.
    pub defer_geometry: bool,
    /// How many emitted changes each card remembers for duplicate detection.
    pub dedup_history: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            strategy: RemapStrategy::ById,
            defer_geometry: true,
            dedup_history: EmissionGuard::DEFAULT_CAPACITY,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &str) -> Result<Self, PersistenceError> {
        let content = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }
}
