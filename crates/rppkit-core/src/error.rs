//! Error handling for RPPKit
//!
//! Provides error types for every layer:
//! - Connection errors (transport open/read/write, session state)
//! - G-Code errors (malformed lines during translation or parsing)
//! - Kinematics errors (travel limit violations)
//! - Controller errors (job and motion gate violations)
//!
//! Protocol timeouts and undecodable bytes are not errors: they are
//! reported as outcomes and events and never abort an operation.

use thiserror::Error;

/// Connection error type
///
/// Any of these is fatal to the serial session that raised it.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// No transport is open
    #[error("Not connected")]
    NotConnected,

    /// A transport is already open
    #[error("Already connected to {port}")]
    AlreadyConnected {
        /// The port currently in use.
        port: String,
    },

    /// Write to the transport failed
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// The underlying I/O failure.
        reason: String,
    },

    /// Read from the transport failed
    #[error("Read failed: {reason}")]
    ReadFailed {
        /// The underlying I/O failure.
        reason: String,
    },

    /// The transport was closed while an operation was pending
    #[error("Transport closed")]
    Closed,
}

/// G-Code error type
///
/// Raised for a single line; callers skip the line and continue.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A numeric field could not be parsed
    #[error("Invalid number for '{field}' at line {line_number}: {text}")]
    InvalidNumber {
        /// The line number where the field was found.
        line_number: u32,
        /// The field letter.
        field: char,
        /// The offending line text.
        text: String,
    },

    /// A required field is missing
    #[error("Missing required parameter '{param}' at line {line_number}: {text}")]
    MissingParameter {
        /// The line number where the parameter was missing.
        line_number: u32,
        /// The name of the missing parameter.
        param: char,
        /// The offending line text.
        text: String,
    },

    /// Jog axis outside 1..=3
    #[error("Unknown jog axis at line {line_number}: {text}")]
    InvalidAxis {
        /// The line number of the jog command.
        line_number: u32,
        /// The offending line text.
        text: String,
    },

    /// The line contains no command
    #[error("Empty command at line {line_number}")]
    Empty {
        /// The line number of the empty command.
        line_number: u32,
    },
}

impl GcodeError {
    /// Line number the error refers to
    pub fn line_number(&self) -> u32 {
        match self {
            Self::InvalidNumber { line_number, .. }
            | Self::MissingParameter { line_number, .. }
            | Self::InvalidAxis { line_number, .. }
            | Self::Empty { line_number } => *line_number,
        }
    }
}

/// Kinematics error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Requested joint position is outside the travel limits
    #[error(
        "Position out of range: d2={extension1:.3} (limit [0, {extension1_max}]), d3={extension2:.3} (limit [0, {extension2_max}])"
    )]
    BoundsViolation {
        /// Requested vertical extension.
        extension1: f64,
        /// Requested radial extension.
        extension2: f64,
        /// Vertical travel limit.
        extension1_max: f64,
        /// Radial travel limit.
        extension2_max: f64,
    },
}

/// Controller error type
///
/// Represents requests that are invalid for the current job or connection state.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    /// A job is running or paused and owns the transport
    #[error("Cannot {operation} while a job is running")]
    JobActive {
        /// The rejected operation.
        operation: String,
    },

    /// Nothing to send
    #[error("No command entered")]
    EmptyCommand,

    /// The command sequence has no lines
    #[error("Command sequence is empty")]
    EmptyJob,
}

/// Main error type for RPPKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Kinematics error
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Source or output file could not be accessed
    #[error("Cannot access file {path}: {reason}")]
    FileAccess {
        /// The path that could not be accessed.
        path: String,
        /// The underlying failure.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a file access error for a path
    pub fn file_access(path: impl AsRef<std::path::Path>, reason: impl std::fmt::Display) -> Self {
        Error::FileAccess {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a bounds violation
    pub fn is_bounds_violation(&self) -> bool {
        matches!(self, Error::Kinematics(KinematicsError::BoundsViolation { .. }))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    /// Check if this is a file access error
    pub fn is_file_access_error(&self) -> bool {
        matches!(self, Error::FileAccess { .. })
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::FailedToOpen {
            port: "/dev/ttyUSB0".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open port /dev/ttyUSB0: No such file or directory"
        );
        assert_eq!(ConnectionError::Closed.to_string(), "Transport closed");
    }

    #[test]
    fn test_gcode_error_carries_line_context() {
        let err = GcodeError::InvalidNumber {
            line_number: 7,
            field: 'X',
            text: "G1 Xabc".to_string(),
        };
        assert_eq!(err.line_number(), 7);
        assert_eq!(err.to_string(), "Invalid number for 'X' at line 7: G1 Xabc");
    }

    #[test]
    fn test_error_conversion_and_predicates() {
        let err: Error = ConnectionError::NotConnected.into();
        assert!(err.is_connection_error());
        assert!(!err.is_gcode_error());

        let err: Error = KinematicsError::BoundsViolation {
            extension1: 10.0,
            extension2: 1200.0,
            extension1_max: 1000.0,
            extension2_max: 1000.0,
        }
        .into();
        assert!(err.is_bounds_violation());

        let err = Error::file_access("/tmp/missing.gcode", "not found");
        assert!(err.is_file_access_error());
        assert_eq!(
            err.to_string(),
            "Cannot access file /tmp/missing.gcode: not found"
        );
    }
}
