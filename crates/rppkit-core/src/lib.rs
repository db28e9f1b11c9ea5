//! # RPPKit Core
//!
//! Core types shared by every RPPKit crate.
//! Provides the joint/Cartesian data model of the cylindrical robot,
//! the device dialect command type, the error taxonomy and the
//! event channel used to report progress to the presentation layer.

pub mod command;
pub mod data;
pub mod error;
pub mod event;

pub use command::{parse_program, strip_comment, DeviceCommand, JointAxis};

pub use data::{CartesianPosition, ConnectionState, JobId, JobState, JointState, MachineGeometry};

pub use error::{ConnectionError, ControllerError, Error, GcodeError, KinematicsError, Result};

pub use event::{DeviceEvent, EventDispatcher, LogLevel};
