//! Bootstrap configuration resolution tests
//!
//! Uses serial_test because several tests set ONAIR_* environment variables.

use onair_common::config::{
    default_database_path, CliOverrides, ConfigResolver, DEFAULT_PORT, ENV_DATABASE, ENV_PORT,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn clear_env() {
    env::remove_var(ENV_DATABASE);
    env::remove_var(ENV_PORT);
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    clear_env();

    let cli = CliOverrides {
        config_file: Some(PathBuf::from("/nonexistent/onair/config.toml")),
        ..Default::default()
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.database_path, default_database_path());
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.logging.level, "info");
}

#[test]
#[serial]
fn test_toml_values_used_when_no_overrides() {
    clear_env();
    let file = write_config(
        r#"
        database_path = "/tmp/onair-toml.db"
        port = 6100
        [logging]
        level = "debug"
        "#,
    );

    let cli = CliOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.database_path, PathBuf::from("/tmp/onair-toml.db"));
    assert_eq!(config.port, 6100);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let file = write_config("database_path = \"/tmp/onair-toml.db\"\nport = 6100\n");
    env::set_var(ENV_DATABASE, "/tmp/onair-env.db");
    env::set_var(ENV_PORT, "6200");

    let cli = CliOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.database_path, PathBuf::from("/tmp/onair-env.db"));
    assert_eq!(config.port, 6200);
    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_everything() {
    clear_env();
    let file = write_config("database_path = \"/tmp/onair-toml.db\"\nport = 6100\n");
    env::set_var(ENV_DATABASE, "/tmp/onair-env.db");
    env::set_var(ENV_PORT, "6200");

    let cli = CliOverrides {
        database_path: Some(PathBuf::from("/tmp/onair-cli.db")),
        port: Some(6300),
        config_file: Some(file.path().to_path_buf()),
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.database_path, PathBuf::from("/tmp/onair-cli.db"));
    assert_eq!(config.port, 6300);
    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_is_ignored() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");

    let cli = CliOverrides {
        config_file: Some(PathBuf::from("/nonexistent/config.toml")),
        ..Default::default()
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.port, DEFAULT_PORT);
    clear_env();
}

#[test]
#[serial]
fn test_malformed_toml_is_not_fatal() {
    clear_env();
    let file = write_config("this is = = not toml");

    let cli = CliOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = ConfigResolver::new("test").resolve(&cli);

    assert_eq!(config.port, DEFAULT_PORT);
}
