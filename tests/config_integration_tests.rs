//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Defaults for missing files and missing keys
//! - Invalid YAML is reported, not silently replaced
//! - Project snapshots survive a save/load cycle

use simlink::models::{
    ConfigRef, InputAction, InputDevice, ItemKind, Modifier, Operand, OutputDevice, Precondition,
    Source, SourceKind,
};
use simlink::{ConfigFile, ConfigItem, ConfigManager, ControllerBinding, Project, Settings};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
}

#[test]
fn test_create_nested_config_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("a").join("b");

    let manager = ConfigManager::new(&nested).unwrap();

    assert!(manager.config_dir().exists());
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings, Settings::default());
}

#[test]
fn test_partial_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join("simlink.yaml"),
        "execution:\n  tick_interval_ms: 25\nlogging:\n  console: false\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.execution.tick_interval_ms, 25);
    assert_eq!(settings.execution.frontend_interval_ms, 100);
    assert!(!settings.logging.console);
    assert_eq!(settings.logging.directory, "logs");
}

#[test]
fn test_invalid_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join("simlink.yaml"), "execution: [not, a, map").unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_save_and_reload_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings::default();
    settings.execution.auto_bind_on_load = false;
    settings.logging.prefix = "cockpit".to_string();
    manager.save_settings(&settings).unwrap();

    assert!(manager.settings_path().exists());
    assert_eq!(manager.load_settings().unwrap(), settings);
}

#[test]
fn test_project_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut output = ConfigItem::output(
        "Gear LED",
        Some(Source::new(SourceKind::SimConnect, "GEAR HANDLE POSITION")),
        OutputDevice::Output { pin: "13".into() },
    )
    .with_device_ref("MyBoard/ SN-1");
    output
        .preconditions
        .push(Precondition::variable("power", Operand::Equal, "1"));
    output.modifiers.push(Modifier::transformation("$*255"));

    let mut input = ConfigItem::input(
        "Gear lever",
        "Button1",
        InputDevice::Button {
            on_press: Some(InputAction::new(SourceKind::Variable, "gear")),
            on_release: None,
        },
    )
    .with_device_ref("MyBoard/ SN-1");
    if let ItemKind::Input(config) = &mut input.kind {
        config.config_refs.push(ConfigRef::new(output.guid.clone(), "#"));
    }

    let mut project = Project::new("Cessna", vec![ConfigFile::new("Panel", vec![output, input])]);
    project
        .controller_bindings
        .push(ControllerBinding::matched("MyBoard/ SN-1"));

    let path = config_path.join("cessna.yaml");
    manager.save_project(&project, &path).unwrap();
    let loaded = manager.load_project(&path).unwrap();

    assert_eq!(loaded, project);
}

#[test]
fn test_load_missing_project() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let result = manager.load_project(config_path.join("missing.yaml"));

    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("Failed to read project"));
}
