use proptest::prelude::*;
use rppkit_core::{CartesianPosition, DeviceCommand, JointState, MachineGeometry};
use rppkit_kinematics::{
    forward_kinematics, inverse_from_cartesian, preview, preview_file, KinematicsModel,
    ROTATION_EPSILON,
};

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

proptest! {
    #[test]
    fn test_inverse_recovers_forward(
        rotation in -720.0f64..720.0,
        extension1 in 0.0f64..1000.0,
        extension2 in 0.01f64..1000.0,
        base_height in -50.0f64..50.0,
    ) {
        let geometry = MachineGeometry::new(base_height, 1000.0, 1000.0);
        let joints = JointState::new(rotation, extension1, extension2);

        let position = forward_kinematics(&joints, &geometry);
        let back = inverse_from_cartesian(position, 0.0, &geometry);

        prop_assert!((back.extension1 - extension1).abs() < 1e-6);
        prop_assert!((back.extension2 - extension2).abs() < 1e-6);
        prop_assert!(back.rotation >= 0.0 && back.rotation < 360.0);
        prop_assert!(angle_diff(back.rotation, rotation) < 1e-4);
    }

    #[test]
    fn test_inverse_on_axis_keeps_prior(
        prior in 0.0f64..360.0,
        extension2 in 0.0f64..(ROTATION_EPSILON * 0.9),
        z in 0.0f64..100.0,
    ) {
        let geometry = MachineGeometry::default();
        let position = CartesianPosition::new(extension2, 0.0, z);
        let back = inverse_from_cartesian(position, prior, &geometry);
        prop_assert_eq!(back.rotation, prior);
    }

    #[test]
    fn test_model_never_leaves_travel(
        moves in proptest::collection::vec((-1500.0f64..1500.0, -1500.0f64..1500.0, -100.0f64..1100.0), 1..40)
    ) {
        let geometry = MachineGeometry::default();
        let mut model = KinematicsModel::new(geometry);
        let mut applied = 0;
        for (x, y, z) in moves {
            let command = DeviceCommand::LinearMove {
                rapid: false,
                x: Some(x),
                y: Some(y),
                z: Some(z),
                feedrate: Some(1000.0),
            };
            if model.apply(&command).is_ok() {
                applied += 1;
            }
            let joints = model.joints();
            prop_assert!(geometry.contains(joints.extension1, joints.extension2));
        }
        prop_assert_eq!(model.trajectory().len(), applied);
    }
}

#[test]
fn test_preview_file_and_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("part.gcode");
    std::fs::write(
        &program,
        "G28\nG90\nG01 X10.000 Y0.000 F1000.000\nG01 Z5.000 F1000.000\nG01 Xbad\nM114\n",
    )
    .unwrap();

    let report = preview_file(&program, MachineGeometry::default()).unwrap();
    assert_eq!(report.applied, 5);
    assert_eq!(report.parse_errors.len(), 1);
    assert_eq!(report.parse_errors[0].line_number(), 5);

    let csv = dir.path().join("trajectory.csv");
    report.trajectory.save_csv(&csv).unwrap();
    let written = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "X,Y,Z");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "10.000,0.000,5.000");
}

#[test]
fn test_only_moving_commands_are_recorded() {
    let commands = vec![
        DeviceCommand::Home,
        DeviceCommand::absolute_mode(),
        DeviceCommand::ReportPosition,
        DeviceCommand::LinearMove {
            rapid: true,
            x: None,
            y: None,
            z: None,
            feedrate: Some(500.0),
        },
    ];
    let report = preview(&commands, MachineGeometry::default());
    assert_eq!(report.applied, 4);
    assert_eq!(report.trajectory.len(), 1);
}
