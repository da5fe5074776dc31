//! Persisted user settings.
//!
//! Stored as JSON in `<config dir>/mdrec/settings.json`. Only values that
//! survive between runs live here: provider credentials and per-recorder
//! calibration. Everything else comes from the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{Calibration, RecorderModel};

/// Environment variable holding a Spotify Web API access token
pub const SPOTIFY_TOKEN_ENV_VAR: &str = "SPOTIFY_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Spotify Web API access token (the environment variable takes precedence)
    #[serde(default)]
    pub spotify_access_token: Option<String>,

    /// Base URL of the beefweb plugin (None = http://localhost:8880)
    #[serde(default)]
    pub beefweb_url: Option<String>,

    /// Calibration keyed by recorder identifier
    #[serde(default)]
    pub calibration: HashMap<String, Calibration>,
}

impl Settings {
    /// Location of the settings file
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mdrec")
            .join("settings.json")
    }

    /// Load settings, falling back to defaults if the file is missing or unreadable
    pub fn load() -> Self {
        let path = Self::path();
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings file {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn calibration_for(&self, recorder: RecorderModel) -> Option<&Calibration> {
        self.calibration.get(recorder.as_str())
    }

    /// Merge new calibration values for a recorder, keeping fields that are not given
    pub fn set_calibration(&mut self, recorder: RecorderModel, update: Calibration) {
        let entry = self
            .calibration
            .entry(recorder.as_str().to_string())
            .or_default();
        if update.press_ms.is_some() {
            entry.press_ms = update.press_ms;
        }
        if update.tmark_offset_secs.is_some() {
            entry.tmark_offset_secs = update.tmark_offset_secs;
        }
    }

    /// Spotify token from the environment, then from settings
    pub fn spotify_token(&self) -> Option<String> {
        std::env::var(SPOTIFY_TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.spotify_access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_calibration_merges_fields() {
        let mut settings = Settings::default();
        settings.set_calibration(
            RecorderModel::R909,
            Calibration {
                press_ms: Some(180),
                tmark_offset_secs: Some(0.7),
            },
        );
        settings.set_calibration(
            RecorderModel::R909,
            Calibration {
                press_ms: None,
                tmark_offset_secs: Some(1.2),
            },
        );

        let cal = settings.calibration_for(RecorderModel::R909).unwrap();
        assert_eq!(cal.press_ms, Some(180));
        assert_eq!(cal.tmark_offset_secs, Some(1.2));
        assert!(settings.calibration_for(RecorderModel::R55ToR900).is_none());
    }

    #[test]
    fn test_settings_tolerate_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"beefweb_url": "http://nas:8880"}"#).unwrap();
        assert_eq!(settings.beefweb_url.as_deref(), Some("http://nas:8880"));
        assert!(settings.calibration.is_empty());
        assert!(settings.spotify_access_token.is_none());
    }
}
