//! Machine configuration
//!
//! Robot geometry, feedrate limits, slicer offsets and protocol timeouts.
//! Stored as TOML or JSON, chosen by file extension. Sections left out of a
//! file take their defaults.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use rppkit_core::MachineGeometry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Slicer to device offsets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetSettings {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Protocol timing in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Wait after opening the port
    pub settle_ms: u64,
    /// Prompt window after connecting
    pub connect_ms: u64,
    /// Response window for manual commands
    pub manual_ms: u64,
    /// Response window for streamed lines
    pub stream_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            connect_ms: 5_000,
            manual_ms: 2_000,
            stream_ms: 3_600_000,
        }
    }
}

impl TimeoutSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn manual(&self) -> Duration {
        Duration::from_millis(self.manual_ms)
    }

    pub fn stream(&self) -> Duration {
        Duration::from_millis(self.stream_ms)
    }
}

/// Complete machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Feedrate cap applied during translation
    pub max_feedrate: f64,
    /// Feedrate for jog commands
    pub jog_feedrate: f64,
    pub geometry: MachineGeometry,
    pub offset: OffsetSettings,
    pub timeouts: TimeoutSettings,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_feedrate: 1000.0,
            jog_feedrate: 1000.0,
            geometry: MachineGeometry::default(),
            offset: OffsetSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl MachineConfig {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(other.unwrap_or("none").to_string()).into())
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No machine config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(other.unwrap_or("none").to_string()).into())
            }
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let positive = [
            ("geometry.extension1_max", self.geometry.extension1_max),
            ("geometry.extension2_max", self.geometry.extension2_max),
            ("max_feedrate", self.max_feedrate),
            ("jog_feedrate", self.jog_feedrate),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(out_of_range(key, value));
            }
        }

        let finite = [
            ("geometry.base_height", self.geometry.base_height),
            ("offset.x", self.offset.x),
            ("offset.y", self.offset.y),
            ("offset.z", self.offset.z),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(out_of_range(key, value));
            }
        }

        let windows = [
            ("timeouts.connect_ms", self.timeouts.connect_ms),
            ("timeouts.manual_ms", self.timeouts.manual_ms),
            ("timeouts.stream_ms", self.timeouts.stream_ms),
        ];
        for (key, value) in windows {
            if value == 0 {
                return Err(out_of_range(key, value));
            }
        }

        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn out_of_range(key: &str, value: impl std::fmt::Display) -> SettingsError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MachineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeouts.stream(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validate_rejects_zero_feedrate() {
        let config = MachineConfig {
            max_feedrate: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config error: Value out of range for 'max_feedrate': 0"
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MachineConfig = toml::from_str(
            r#"
            max_feedrate = 600.0

            [geometry]
            extension2_max = 350.0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_feedrate, 600.0);
        assert_eq!(config.geometry.extension2_max, 350.0);
        assert_eq!(config.geometry.extension1_max, 1000.0);
        assert_eq!(config.timeouts, TimeoutSettings::default());
    }
}
