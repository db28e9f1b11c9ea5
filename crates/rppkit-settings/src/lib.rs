//! # RPPKit Settings
//!
//! Persistence for the sender's flat settings record (`settings.json`) and
//! for the machine configuration (geometry, feedrates, offsets, timeouts).

pub mod error;
pub mod machine;
pub mod sender;

pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
pub use machine::{MachineConfig, OffsetSettings, TimeoutSettings};
pub use sender::{SenderSettings, DEFAULT_BAUD, SETTINGS_FILE};

use std::path::PathBuf;

/// Platform configuration directory for RPPKit, created if missing
pub fn default_config_dir() -> SettingsResult<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))?
        .join("rppkit");
    std::fs::create_dir_all(&dir)
        .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", dir.display(), e)))?;
    Ok(dir)
}
