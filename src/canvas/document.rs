use crate::card::CardSnapshot;
use crate::connection::Connection;
use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};
use std::fs;

/// The persisted form of a canvas: cards and the flat connection array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    #[serde(default)]
    pub cards: Vec<CardSnapshot>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl CanvasDocument {
    /// Parses a document. Socket arrays are normalized on the way in.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_file(path: &str) -> Result<Self, PersistenceError> {
        let content = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &str) -> Result<(), PersistenceError> {
        fs::write(path, self.to_json()?).map_err(|source| PersistenceError::Io {
            path: path.to_string(),
            source,
        })
    }
}
