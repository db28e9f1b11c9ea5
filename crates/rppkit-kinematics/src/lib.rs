//! # RPPKit Kinematics
//!
//! Coordinate transforms between the Cartesian frame and the joint space
//! of a rotation/prismatic/prismatic robot, the stateful kinematic model
//! that tracks the device while commands are applied, and a transport-free
//! preview of a whole program.

pub mod model;
pub mod preview;
pub mod trajectory;
pub mod transform;

pub use model::KinematicsModel;
pub use preview::{preview, preview_file, PreviewReport, RejectedCommand};
pub use trajectory::TrajectoryLog;
pub use transform::{
    forward_kinematics, inverse_from_cartesian, offset_and_clamp, WorkOffset, ROTATION_EPSILON,
};
