//! # RPPKit
//!
//! Drives a cylindrical (rotation + two prismatic axes) robot over a serial
//! link:
//! - translates slicer G-Code into the device dialect
//! - previews programs against the robot's kinematics and travel limits
//! - streams programs under the device's `ready>` handshake with pause,
//!   resume and stop
//!
//! ## Architecture
//!
//! RPPKit is organized as a workspace with multiple crates:
//!
//! 1. **rppkit-core** - Data model, device commands, errors, events
//! 2. **rppkit-kinematics** - Transforms, kinematic model, trajectory, preview
//! 3. **rppkit-translator** - Slicer G-Code to device dialect
//! 4. **rppkit-communication** - Serial transport, session, streaming controller
//! 5. **rppkit-settings** - Sender settings and machine configuration
//! 6. **rppkit** - Headless binary that integrates all crates

pub use rppkit_core::{
    parse_program, strip_comment, CartesianPosition, ConnectionError, ConnectionState,
    ControllerError, DeviceCommand, DeviceEvent, Error, EventDispatcher, GcodeError, JobId,
    JobState, JointAxis, JointState, KinematicsError, LogLevel, MachineGeometry, Result,
};

pub use rppkit_kinematics::{
    forward_kinematics, inverse_from_cartesian, offset_and_clamp, preview, preview_file,
    KinematicsModel, PreviewReport, TrajectoryLog, WorkOffset,
};

pub use rppkit_translator::{DialectTranslator, TranslationReport, TranslatorConfig};

pub use rppkit_communication::{
    list_ports, ControllerConfig, JobSummary, MachineController, MachineSnapshot, SendOutcome,
    SerialConnector, SessionConfig,
};

pub use rppkit_settings::{MachineConfig, SenderSettings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Translator settings from a machine configuration
pub fn translator_config(config: &MachineConfig) -> TranslatorConfig {
    TranslatorConfig {
        max_feedrate: config.max_feedrate,
        offset: WorkOffset::new(config.offset.x, config.offset.y, config.offset.z),
        geometry: config.geometry,
    }
}

/// Controller settings from a machine configuration
pub fn controller_config(config: &MachineConfig) -> ControllerConfig {
    ControllerConfig {
        session: SessionConfig {
            settle_delay: config.timeouts.settle(),
            connect_timeout: config.timeouts.connect(),
            manual_timeout: config.timeouts.manual(),
            stream_timeout: config.timeouts.stream(),
            ..SessionConfig::default()
        },
        geometry: config.geometry,
    }
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr
/// - RUST_LOG environment variable support, INFO by default
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging as one JSON object per line
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
