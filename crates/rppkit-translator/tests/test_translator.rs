use rppkit_core::{DeviceCommand, MachineGeometry};
use rppkit_kinematics::WorkOffset;
use rppkit_translator::{DialectTranslator, TranslatorConfig};

fn rendered(translator: &DialectTranslator, input: &str) -> Vec<String> {
    translator
        .translate(input)
        .commands
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[test]
fn test_thermal_line_dropped_and_home_resets() {
    let translator = DialectTranslator::default();
    let report = translator.translate("M104 S200\nG1 X10 Y20 F500\nG28\n");

    assert_eq!(
        report.commands,
        vec![
            DeviceCommand::Home,
            DeviceCommand::absolute_mode(),
            DeviceCommand::LinearMove {
                rapid: false,
                x: Some(10.0),
                y: Some(20.0),
                z: None,
                feedrate: Some(500.0),
            },
            DeviceCommand::Home,
            DeviceCommand::ReportPosition,
        ]
    );
    assert_eq!(report.stats.lines_read, 3);
    assert_eq!(report.stats.filtered, 1);
    assert_eq!(report.stats.discarded(), 1);
    assert_eq!(report.stats.emitted, 5);
}

#[test]
fn test_feedrate_is_sticky() {
    let translator = DialectTranslator::default();
    assert_eq!(
        rendered(&translator, "G1 X1 F300\nG1 X2\n"),
        vec![
            "G28",
            "G90",
            "G01 X1.000 F300.000",
            "G01 X2.000 F300.000",
            "M114"
        ]
    );
}

#[test]
fn test_malformed_line_skipped_with_context() {
    let translator = DialectTranslator::default();
    let report = translator.translate("G1 X1\nG1 Xoops Y2\nG1 Y3\n");

    assert_eq!(report.stats.malformed, 1);
    assert_eq!(report.commands.len(), 5);
    let warning = report.warnings().next().unwrap();
    assert_eq!(warning.line_number, 2);
    assert_eq!(warning.text, "G1 Xoops Y2");
}

#[test]
fn test_offsets_and_out_of_bounds() {
    let translator = DialectTranslator::new(TranslatorConfig {
        max_feedrate: 800.0,
        offset: WorkOffset::new(100.0, 100.0, 0.0),
        geometry: MachineGeometry::new(0.0, 200.0, 200.0),
    });
    let report = translator.translate("G0 X150 Y100 Z10\nG1 X600\nG1 X100 Y200\nG1 Z-5\n");

    let lines: Vec<String> = report.commands.iter().map(|c| c.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "G28",
            "G90",
            "G00 X50.000 Y0.000 Z10.000 F800.000",
            "G01 X0.000 Y100.000 F800.000",
            "M114"
        ]
    );
    assert_eq!(report.stats.out_of_bounds, 2);
    assert_eq!(report.warnings().count(), 2);
}

#[test]
fn test_comments_and_blank_lines() {
    let translator = DialectTranslator::default();
    let report = translator.translate(";FLAVOR:Marlin\n\n   \nG90\nG21\n");
    assert_eq!(report.stats.comments, 3);
    assert_eq!(report.stats.unsupported, 1);
    assert_eq!(
        rendered(&translator, "G90\n"),
        vec!["G28", "G90", "G90", "M114"]
    );
}

#[test]
fn test_translate_file_round_trip_through_parser() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("part.gcode");
    let output = dir.path().join("part_rpp.gcode");
    std::fs::write(&input, "G1 X10 Y10 Z1 F1200\nM107\nG0 X0 Y5\n").unwrap();

    let translator = DialectTranslator::default();
    let report = translator.translate_file(&input).unwrap();
    report.write_to(&output).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    let (parsed, errors) = rppkit_core::parse_program(&text);
    assert!(errors.is_empty());
    assert_eq!(parsed, report.commands);

    let err = translator
        .translate_file(dir.path().join("missing.gcode"))
        .unwrap_err();
    assert!(err.is_file_access_error());
}

#[test]
fn test_home_resets_tracker_for_later_partial_moves() {
    let translator = DialectTranslator::new(TranslatorConfig {
        max_feedrate: 1000.0,
        offset: WorkOffset::new(150.0, 0.0, 0.0),
        geometry: MachineGeometry::new(0.0, 100.0, 100.0),
    });

    // Before G28 the Z-only move inherits a reachable X.
    let report = translator.translate("G1 X200 Y0 Z1\nG1 Z5\n");
    assert_eq!(report.stats.out_of_bounds, 0);

    // After G28 it starts from the slicer origin, which maps out of reach.
    let report = translator.translate("G1 X200 Y0 Z1\nG28\nG1 Z5\nG1 X150 Z5\nG1 Z6\n");
    assert_eq!(report.stats.out_of_bounds, 1);
    assert_eq!(report.diagnostics[0].line_number, 3);
    assert_eq!(
        rendered(&translator, "G1 X200 Y0 Z1\nG28\nG1 Z5\nG1 X150 Z5\nG1 Z6\n"),
        vec![
            "G28",
            "G90",
            "G01 X50.000 Y0.000 Z1.000 F1000.000",
            "G28",
            "G01 X0.000 Z5.000 F1000.000",
            "G01 Z6.000 F1000.000",
            "M114"
        ]
    );
}
