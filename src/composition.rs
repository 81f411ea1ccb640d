//! Composition documents.
//!
//! A composition bundles an event tree with the settings used to render it,
//! so a piece can be stored once and rendered by every frontend.

use crate::converters::{IsisSettings, LoudnessSettings, MidiSettings};
use crate::events::Event;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid composition JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid binary composition: {0}")]
    Binary(#[from] bincode::Error),
}

/// An event tree together with its render settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub name: String,
    pub event: Event,
    #[serde(default)]
    pub isis: IsisSettings,
    #[serde(default)]
    pub midi: MidiSettings,
    #[serde(default)]
    pub loudness: LoudnessSettings,
}

impl Composition {
    /// Creates a composition with default render settings.
    pub fn new(name: impl Into<String>, event: impl Into<Event>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
            isis: IsisSettings::default(),
            midi: MidiSettings::default(),
            loudness: LoudnessSettings::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, CompositionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CompositionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Saves the composition as pretty-printed JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CompositionError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        info!(path = %path.as_ref().display(), "saved composition");
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompositionError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Saves the composition with bincode.
    pub fn save_to_binary<P: AsRef<Path>>(&self, path: P) -> Result<(), CompositionError> {
        let data = bincode::serialize(self)?;
        fs::write(path.as_ref(), data)?;
        info!(path = %path.as_ref().display(), "saved binary composition");
        Ok(())
    }

    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<Self, CompositionError> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }

    /// Loads JSON or binary depending on the file extension (`.json` is JSON).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CompositionError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::load_from_file(path),
            _ => Self::load_from_binary(path),
        }
    }
}
