// Settings loading
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PlayerError, Result};

/// Status screen settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Show the file name when the title tag is missing or empty
    pub filename_fallback: bool,
    pub clear_screen: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            filename_fallback: true,
            clear_screen: true,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub buffer_ms: u64,
    pub refresh_ms: u64,
    pub start_looped: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            buffer_ms: 100,
            refresh_ms: 1000,
            start_looped: false,
        }
    }
}

impl PlaybackSettings {
    pub fn buffer(&self) -> Duration {
        Duration::from_millis(self.buffer_ms.max(1))
    }

    /// Idle refresh period
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub playback: PlaybackSettings,
}

impl Settings {
    /// Load settings from `path`, or return defaults if there is no file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::info!(path = %path.display(), "no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| PlayerError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to read settings file: {}", e),
        })?;

        let settings: Settings = serde_json::from_str(&content).map_err(|e| PlayerError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to parse settings: {}", e),
        })?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_path() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.playback.buffer(), Duration::from_millis(100));
        assert_eq!(settings.playback.refresh(), Duration::from_secs(1));
        assert!(settings.display.filename_fallback);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("settings.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "playback": { "start_looped": true } }"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert!(settings.playback.start_looped);
        assert_eq!(settings.playback.refresh_ms, 1000);
        assert!(settings.display.clear_screen);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load(Some(&path)),
            Err(PlayerError::Config { .. })
        ));
    }
}
