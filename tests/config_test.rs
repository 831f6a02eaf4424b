//! Integration tests for configuration loading

use pslab_protocol::config::PslabConfig;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_from_file() {
    let file = write_config(
        r#"
[application]
log_level = "debug"

[protocol]
timeout_ms = 250
expected_version = "PSLab"

[serial]
port = "/dev/ttyUSB3"
baud_rate = 115200
"#,
    );

    let config = PslabConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.protocol.timeout(), Duration::from_millis(250));
    assert_eq!(config.protocol.expected_version, "PSLab");
    assert_eq!(config.serial.port, "/dev/ttyUSB3");
    assert_eq!(config.serial.baud_rate, 115200);
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    let file = write_config("[protocol]\ntimeout_ms = 1000\n");

    let config = PslabConfig::load_from(file.path()).unwrap();
    assert_eq!(config.protocol.timeout_ms, 1000);
    assert_eq!(config.protocol.expected_version, "CS");
    assert_eq!(config.serial.baud_rate, 1_000_000);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let config = PslabConfig::load_from("does/not/exist.toml").unwrap();
    assert_eq!(config, PslabConfig::default());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = write_config("[protocol]\ntimeout_ms = 250\n");

    std::env::set_var("PSLAB_PROTOCOL__TIMEOUT_MS", "750");
    let result = PslabConfig::load_from(file.path());
    std::env::remove_var("PSLAB_PROTOCOL__TIMEOUT_MS");

    assert_eq!(result.unwrap().protocol.timeout_ms, 750);
}

#[test]
#[serial]
fn test_invalid_type_is_rejected() {
    let file = write_config("[protocol]\ntimeout_ms = \"soon\"\n");
    assert!(PslabConfig::load_from(file.path()).is_err());
}
