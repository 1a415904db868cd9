use codebox::config::{Config, InputMode};

use super::FIXTURES_PATH;

#[test]
fn test_load_shell_config() {
    let path = format!("{}/configs/shell.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("sh"));
    assert!(config.languages.contains_key("sh_interpreted"));
    assert_eq!(config.max_parallel_runs, Some(4));
    assert_eq!(config.default_limits.timeout_ms, Some(5000));
    assert_eq!(config.languages["sh_stdin"].run.input_mode, InputMode::Stdin);
    assert!(!config.languages["sh_interpreted"].is_compiled());
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{}/configs/valid_minimal.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("test"));
    assert_eq!(config.default_limits.timeout_ms, Some(10_000));
    assert!(!config.fail_on_stderr);
}

#[test]
fn test_load_missing_file() {
    let path = format!("{}/configs/does_not_exist.toml", FIXTURES_PATH);
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_empty_name() {
    let path = format!("{}/configs/invalid_empty_name.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_empty_extension() {
    let path = format!("{}/configs/invalid_empty_extension.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    let path = format!("{}/configs/invalid_empty_run_command.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_zero_timeout() {
    let path = format!("{}/configs/invalid_zero_timeout.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_input_mode() {
    let path = format!("{}/configs/invalid_input_mode.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_source_name() {
    let path = format!("{}/configs/invalid_source_name.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[test]
fn test_embedded_example_config() {
    let config = Config::parse_toml(codebox::EXAMPLE_CONFIG).expect("example config should parse");

    let java = config.get_language("java").unwrap();
    assert!(java.is_compiled());
    assert_eq!(java.source_name(), "Main.java");
    assert_eq!(java.run.input_mode, InputMode::Argument);
}
