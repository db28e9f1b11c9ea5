use rppkit_settings::{MachineConfig, SenderSettings, SettingsError};

#[test]
fn test_sender_settings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let settings = SenderSettings {
        port: "/dev/ttyUSB0".to_string(),
        baud: "250000".to_string(),
        file: "/home/user/part.gcode".to_string(),
    };
    settings.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"port\": \"/dev/ttyUSB0\""));
    assert_eq!(SenderSettings::load(&path), settings);
}

#[test]
fn test_missing_or_corrupt_settings_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("settings.json");
    assert_eq!(SenderSettings::load(&missing), SenderSettings::default());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{ port: ").unwrap();
    assert_eq!(SenderSettings::load(&corrupt), SenderSettings::default());
    assert!(matches!(
        SenderSettings::try_load(&corrupt),
        Err(SettingsError::JsonError(_))
    ));
}

#[test]
fn test_machine_config_toml_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MachineConfig::default();
    config.geometry.base_height = 42.0;
    config.offset.x = 150.0;
    config.timeouts.manual_ms = 500;

    for name in ["machine.toml", "machine.json"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        assert_eq!(MachineConfig::load_from_file(&path).unwrap(), config);
    }

    let yaml = dir.path().join("machine.yaml");
    assert!(matches!(
        config.save_to_file(&yaml),
        Err(SettingsError::Config(_))
    ));
}

#[test]
fn test_machine_config_load_or_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert_eq!(
        MachineConfig::load_or_default(&path).unwrap(),
        MachineConfig::default()
    );

    std::fs::write(&path, "jog_feedrate = -5.0\n").unwrap();
    assert!(MachineConfig::load_or_default(&path).is_err());
}
