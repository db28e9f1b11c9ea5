//! Kinematic model of the device
//!
//! Tracks the joint state the device should be in after every command
//! sent so far. The Cartesian position is always derived from the joints.

use crate::trajectory::TrajectoryLog;
use crate::transform::{forward_kinematics, inverse_from_cartesian};
use rppkit_core::{
    CartesianPosition, DeviceCommand, JointAxis, JointState, KinematicsError, MachineGeometry,
};

/// Stateful joint/Cartesian model
#[derive(Debug, Clone)]
pub struct KinematicsModel {
    geometry: MachineGeometry,
    joints: JointState,
    position: CartesianPosition,
    trajectory: TrajectoryLog,
}

impl KinematicsModel {
    /// Create a model at the home position
    pub fn new(geometry: MachineGeometry) -> Self {
        let joints = JointState::default();
        Self {
            position: forward_kinematics(&joints, &geometry),
            geometry,
            joints,
            trajectory: TrajectoryLog::new(),
        }
    }

    pub fn geometry(&self) -> &MachineGeometry {
        &self.geometry
    }

    pub fn joints(&self) -> JointState {
        self.joints
    }

    pub fn position(&self) -> CartesianPosition {
        self.position
    }

    pub fn trajectory(&self) -> &TrajectoryLog {
        &self.trajectory
    }

    /// Return to the home position and clear the trajectory
    pub fn reset(&mut self) {
        *self = Self::new(self.geometry);
    }

    /// Apply one command
    ///
    /// On success the new position is returned, and appended to the
    /// trajectory when the command moves the robot. A bounds violation
    /// leaves the model untouched.
    pub fn apply(&mut self, command: &DeviceCommand) -> Result<CartesianPosition, KinematicsError> {
        let joints = match command {
            DeviceCommand::Home => JointState::default(),
            DeviceCommand::LinearMove { x, y, z, .. } => self.linear_target(*x, *y, *z)?,
            DeviceCommand::JogAxis { axis, distance, .. } => self.jog_target(*axis, *distance),
            DeviceCommand::ReportPosition | DeviceCommand::Raw(_) => self.joints,
        };

        self.joints = joints;
        self.position = forward_kinematics(&joints, &self.geometry);
        if command.has_motion() {
            self.trajectory.push(self.position);
        }
        tracing::debug!("Applied {}: {}", command, self.joints);
        Ok(self.position)
    }

    fn linear_target(
        &self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<JointState, KinematicsError> {
        let mut joints = self.joints;

        if x.is_some() || y.is_some() {
            let planar = CartesianPosition::new(
                x.unwrap_or(self.position.x),
                y.unwrap_or(self.position.y),
                self.position.z,
            );
            let target = inverse_from_cartesian(planar, joints.rotation, &self.geometry);
            joints.rotation = target.rotation;
            joints.extension2 = target.extension2;
        }
        if let Some(z) = z {
            joints.extension1 = z - self.geometry.base_height;
        }

        if !self.geometry.contains(joints.extension1, joints.extension2) {
            return Err(KinematicsError::BoundsViolation {
                extension1: joints.extension1,
                extension2: joints.extension2,
                extension1_max: self.geometry.extension1_max,
                extension2_max: self.geometry.extension2_max,
            });
        }
        Ok(joints)
    }

    fn jog_target(&self, axis: JointAxis, distance: f64) -> JointState {
        let mut joints = self.joints;
        match axis {
            JointAxis::Rotation => joints.rotation += distance,
            JointAxis::Extension1 => {
                joints.extension1 =
                    clamp_travel(joints.extension1 + distance, self.geometry.extension1_max)
            }
            JointAxis::Extension2 => {
                joints.extension2 =
                    clamp_travel(joints.extension2 + distance, self.geometry.extension2_max)
            }
        }
        joints
    }
}

/// Clamp into `[0, max]`; a negative or NaN `max` never panics
fn clamp_travel(value: f64, max: f64) -> f64 {
    value.min(max).max(0.0)
}

impl Default for KinematicsModel {
    fn default() -> Self {
        Self::new(MachineGeometry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> DeviceCommand {
        DeviceCommand::LinearMove {
            rapid: false,
            x,
            y,
            z,
            feedrate: Some(1000.0),
        }
    }

    #[test]
    fn test_missing_axis_uses_last_position() {
        let mut model = KinematicsModel::new(MachineGeometry::new(20.0, 1000.0, 1000.0));
        model.apply(&linear(Some(0.0), Some(0.0), Some(70.0))).unwrap();
        model.apply(&linear(Some(100.0), None, None)).unwrap();

        let joints = model.joints();
        assert!((joints.extension1 - 50.0).abs() < 1e-9);
        assert!((joints.extension2 - 100.0).abs() < 1e-9);
        assert!(joints.rotation.abs() < 1e-9);
    }

    #[test]
    fn test_z_only_keeps_planar_joints() {
        let mut model = KinematicsModel::default();
        model.apply(&linear(Some(0.0), Some(30.0), None)).unwrap();
        let before = model.joints();
        model.apply(&linear(None, None, Some(12.0))).unwrap();
        assert_eq!(model.joints().rotation, before.rotation);
        assert_eq!(model.joints().extension2, before.extension2);
        assert_eq!(model.joints().extension1, 12.0);
    }

    #[test]
    fn test_bounds_violation_leaves_state_unchanged() {
        let mut model = KinematicsModel::default();
        model.apply(&linear(Some(10.0), Some(10.0), Some(5.0))).unwrap();
        let joints = model.joints();
        let len = model.trajectory().len();

        let err = model.apply(&linear(Some(2000.0), None, None)).unwrap_err();
        assert!(matches!(err, KinematicsError::BoundsViolation { .. }));
        assert_eq!(model.joints(), joints);
        assert_eq!(model.trajectory().len(), len);

        assert!(model.apply(&linear(None, None, Some(-1.0))).is_err());
        assert_eq!(model.joints(), joints);
    }

    #[test]
    fn test_jog_clamps_extensions() {
        let mut model = KinematicsModel::new(MachineGeometry::new(0.0, 100.0, 50.0));
        let jog = |axis, distance| DeviceCommand::JogAxis {
            axis,
            distance,
            feedrate: None,
        };

        model.apply(&jog(JointAxis::Extension1, -10.0)).unwrap();
        assert_eq!(model.joints().extension1, 0.0);
        model.apply(&jog(JointAxis::Extension2, 80.0)).unwrap();
        assert_eq!(model.joints().extension2, 50.0);
        model.apply(&jog(JointAxis::Rotation, 400.0)).unwrap();
        assert_eq!(model.joints().rotation, 400.0);
    }

    #[test]
    fn test_jog_with_degenerate_travel_does_not_panic() {
        let mut model = KinematicsModel::new(MachineGeometry::new(0.0, -5.0, f64::NAN));
        let jog = |axis| DeviceCommand::JogAxis {
            axis,
            distance: 10.0,
            feedrate: None,
        };

        model.apply(&jog(JointAxis::Extension1)).unwrap();
        assert_eq!(model.joints().extension1, 0.0);
        model.apply(&jog(JointAxis::Extension2)).unwrap();
        assert_eq!(model.joints().extension2, 10.0);
    }

    #[test]
    fn test_home_and_passthrough() {
        let mut model = KinematicsModel::default();
        model.apply(&linear(Some(10.0), Some(0.0), Some(10.0))).unwrap();
        let here = model.position();
        assert_eq!(model.apply(&DeviceCommand::ReportPosition).unwrap(), here);
        assert_eq!(model.apply(&DeviceCommand::absolute_mode()).unwrap(), here);
        assert_eq!(model.apply(&linear(None, None, None)).unwrap(), here);

        let origin = model.apply(&DeviceCommand::Home).unwrap();
        assert_eq!(origin, CartesianPosition::new(0.0, 0.0, 0.0));
        assert_eq!(model.joints(), JointState::default());
        assert_eq!(model.trajectory().len(), 2);
        assert_eq!(model.trajectory().last(), Some(&origin));

        model.reset();
        assert!(model.trajectory().is_empty());
    }
}
