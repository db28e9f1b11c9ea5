//! Dry-run preview of a device-dialect program

use crate::model::KinematicsModel;
use crate::trajectory::TrajectoryLog;
use rppkit_core::{
    parse_program, DeviceCommand, Error, GcodeError, JointState, KinematicsError,
    MachineGeometry, Result,
};
use std::path::Path;

/// A command the model refused
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCommand {
    /// Zero-based index in the command sequence
    pub index: usize,
    pub command: DeviceCommand,
    pub error: KinematicsError,
}

/// Outcome of a preview run
#[derive(Debug, Clone, Default)]
pub struct PreviewReport {
    /// Positions visited, one per applied command
    pub trajectory: TrajectoryLog,
    /// Number of commands applied
    pub applied: usize,
    /// Commands rejected by the travel limits
    pub rejected: Vec<RejectedCommand>,
    /// Lines that could not be parsed (file previews only)
    pub parse_errors: Vec<GcodeError>,
    /// Joint state after the last command
    pub final_joints: JointState,
}

impl PreviewReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.parse_errors.is_empty()
    }
}

impl std::fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Applied: {}", self.applied)?;
        writeln!(f, "Rejected: {}", self.rejected.len())?;
        writeln!(f, "Parse errors: {}", self.parse_errors.len())?;
        writeln!(f, "Path length: {:.3}", self.trajectory.path_length())?;
        write!(f, "Final joints: {}", self.final_joints)
    }
}

/// Run a fresh model over `commands` without touching a transport
pub fn preview(commands: &[DeviceCommand], geometry: MachineGeometry) -> PreviewReport {
    let mut model = KinematicsModel::new(geometry);
    let mut report = PreviewReport::default();

    for (index, command) in commands.iter().enumerate() {
        match model.apply(command) {
            Ok(_) => report.applied += 1,
            Err(error) => {
                tracing::warn!("Preview line {} ({}): {}", index + 1, command, error);
                report.rejected.push(RejectedCommand {
                    index,
                    command: command.clone(),
                    error,
                });
            }
        }
    }

    report.final_joints = model.joints();
    report.trajectory = model.trajectory().clone();
    tracing::info!(
        "Preview complete: {} applied, {} rejected",
        report.applied,
        report.rejected.len()
    );
    report
}

/// Preview a device-dialect file
pub fn preview_file(path: impl AsRef<Path>, geometry: MachineGeometry) -> Result<PreviewReport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
    let (commands, parse_errors) = parse_program(&text);
    for error in &parse_errors {
        tracing::warn!("Skipping line: {}", error);
    }

    let mut report = preview(&commands, geometry);
    report.parse_errors = parse_errors;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_counts_rejections() {
        let commands = vec![
            DeviceCommand::Home,
            DeviceCommand::LinearMove {
                rapid: false,
                x: Some(5000.0),
                y: None,
                z: None,
                feedrate: Some(100.0),
            },
            DeviceCommand::LinearMove {
                rapid: false,
                x: Some(10.0),
                y: Some(0.0),
                z: Some(1.0),
                feedrate: Some(100.0),
            },
        ];
        let report = preview(&commands, MachineGeometry::default());
        assert_eq!(report.applied, 2);
        assert_eq!(report.trajectory.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert!(!report.is_clean());
        assert!((report.final_joints.extension2 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_preview_missing_file() {
        let err = preview_file("/no/such/program.gcode", MachineGeometry::default()).unwrap_err();
        assert!(err.is_file_access_error());
    }
}
