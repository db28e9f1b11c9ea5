//! Sender settings record
//!
//! Remembers the last port, baud rate and file between runs. Loading never
//! fails: a missing or unreadable file falls back to defaults.

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default settings file name, relative to the working directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Default baud rate
pub const DEFAULT_BAUD: &str = "115200";

/// Last-used connection and file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub port: String,
    /// Kept as text, the way it was entered
    pub baud: String,
    pub file: String,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: DEFAULT_BAUD.to_string(),
            file: String::new(),
        }
    }
}

impl SenderSettings {
    /// Load settings, falling back to defaults with a warning
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(SettingsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Error loading settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings, reporting any failure
    pub fn try_load(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> SettingsResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Parsed baud rate
    pub fn baud_rate(&self) -> SettingsResult<u32> {
        match self.baud.trim().parse::<u32>() {
            Ok(rate) if rate > 0 => Ok(rate),
            _ => Err(SettingsError::InvalidSetting {
                key: "baud".to_string(),
                reason: format!("'{}' is not a valid baud rate", self.baud),
            }),
        }
    }
}
