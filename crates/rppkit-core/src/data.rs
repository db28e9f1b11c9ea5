//! Data model for the cylindrical (RPP) robot
//!
//! Joint space is one rotation plus two prismatic extensions:
//! - rotation about the vertical axis, in degrees
//! - extension1, the vertical stroke above the base
//! - extension2, the radial stroke away from the rotation axis
//!
//! Cartesian positions are always derived from the joint state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical dimensions and travel limits of the robot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineGeometry {
    /// Height of the extension1 zero point above the Cartesian origin
    pub base_height: f64,
    /// Maximum vertical travel
    pub extension1_max: f64,
    /// Maximum radial travel
    pub extension2_max: f64,
}

impl Default for MachineGeometry {
    fn default() -> Self {
        Self {
            base_height: 0.0,
            extension1_max: 1000.0,
            extension2_max: 1000.0,
        }
    }
}

impl MachineGeometry {
    /// Create a geometry with explicit dimensions
    pub fn new(base_height: f64, extension1_max: f64, extension2_max: f64) -> Self {
        Self {
            base_height,
            extension1_max,
            extension2_max,
        }
    }

    /// Check whether both extensions lie inside their travel
    pub fn contains(&self, extension1: f64, extension2: f64) -> bool {
        (0.0..=self.extension1_max).contains(&extension1)
            && (0.0..=self.extension2_max).contains(&extension2)
    }
}

/// Joint coordinates of the robot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointState {
    /// Rotation in degrees
    pub rotation: f64,
    /// Vertical extension
    pub extension1: f64,
    /// Radial extension
    pub extension2: f64,
}

impl JointState {
    /// Create a joint state
    pub fn new(rotation: f64, extension1: f64, extension2: f64) -> Self {
        Self {
            rotation,
            extension1,
            extension2,
        }
    }
}

impl std::fmt::Display for JointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "θ1={:.1}°, d2={:.1}, d3={:.1}",
            self.rotation, self.extension1, self.extension2
        )
    }
}

/// End effector position in the Cartesian frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianPosition {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl CartesianPosition {
    /// Create a position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &CartesianPosition) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for CartesianPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X={:.3}, Y={:.3}, Z={:.3}", self.x, self.y, self.z)
    }
}

/// Connection state of a serial session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport open
    #[default]
    Disconnected,
    /// Transport open, waiting for the device prompt
    Connecting,
    /// Ready to accept a command
    Ready,
    /// A line has been written and its response is awaited
    Sending,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Ready => write!(f, "Ready"),
            Self::Sending => write!(f, "Sending"),
        }
    }
}

/// Lifecycle state of a streaming job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobState {
    /// No job
    #[default]
    Idle,
    /// Commands are being streamed
    Running,
    /// Streaming suspended by the caller
    Paused,
    /// Aborted by the caller or by a transport failure
    Stopped,
    /// Every command was sent
    Complete,
}

impl JobState {
    /// Whether the job currently owns the transport
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Paused => write!(f, "Paused"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// Identifier of a streaming job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new unique job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job({})", &self.0.to_string()[..8])
    }
}
