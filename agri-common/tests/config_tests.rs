//! Tests for configuration loading and credential resolution
//!
//! Tests that manipulate environment variables are marked #[serial]
//! so they never run in parallel with each other.

use agri_common::config::{
    config_source, load_toml_config, resolve_weather_api_key, KeySource, TomlConfig, CONFIG_PATH_ENV,
    FALLBACK_WEATHER_API_KEY, WEATHER_API_KEY_ENV,
};
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn test_env_key_overrides_toml() {
    std::env::set_var(WEATHER_API_KEY_ENV, "env-key");
    let config = TomlConfig {
        weather_api_key: Some("toml-key".to_string()),
        ..TomlConfig::default()
    };

    let (key, source) = resolve_weather_api_key(&config);
    assert_eq!(key, "env-key");
    assert_eq!(source, KeySource::Environment);

    std::env::remove_var(WEATHER_API_KEY_ENV);
}

#[test]
#[serial]
fn test_toml_key_when_env_missing() {
    std::env::remove_var(WEATHER_API_KEY_ENV);
    let config = TomlConfig {
        weather_api_key: Some("toml-key".to_string()),
        ..TomlConfig::default()
    };

    let (key, source) = resolve_weather_api_key(&config);
    assert_eq!(key, "toml-key");
    assert_eq!(source, KeySource::Toml);
}

#[test]
#[serial]
fn test_whitespace_key_falls_through_to_fallback() {
    std::env::set_var(WEATHER_API_KEY_ENV, "   ");
    let config = TomlConfig {
        weather_api_key: Some("".to_string()),
        ..TomlConfig::default()
    };

    let (key, source) = resolve_weather_api_key(&config);
    assert_eq!(key, FALLBACK_WEATHER_API_KEY);
    assert_eq!(source, KeySource::Fallback);

    std::env::remove_var(WEATHER_API_KEY_ENV);
}

#[test]
#[serial]
fn test_explicit_config_file_loaded() {
    std::env::remove_var(CONFIG_PATH_ENV);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "api_base_url = \"http://farm.local:5000\"\nrequest_timeout_secs = 15\n")
        .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.api_base_url, "http://farm.local:5000");
    assert_eq!(config.request_timeout_secs, Some(15));
}

#[test]
#[serial]
fn test_config_path_from_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agrisense.toml");
    std::fs::write(&path, "default_unit = \"imperial\"\n").unwrap();
    std::env::set_var(CONFIG_PATH_ENV, &path);

    let config = load_toml_config(None).unwrap();
    assert_eq!(config.default_unit, "imperial");

    std::env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    std::env::remove_var(CONFIG_PATH_ENV);
    let dir = TempDir::new().unwrap();
    let result = load_toml_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(agri_common::Error::Config(_))));
}

#[test]
#[serial]
fn test_config_source_prefers_explicit_then_env() {
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    let from_env = temp_dir.path().join("env.toml");

    std::env::set_var(CONFIG_PATH_ENV, &from_env);
    assert_eq!(config_source(Some(&explicit)), Some(explicit.clone()));
    assert_eq!(config_source(None), Some(from_env.clone()));
    std::env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_config_source_matches_loaded_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "api_base_url = \"http://farm.local:5000\"\n").unwrap();
    std::env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(config_source(Some(&path)), Some(path.clone()));
    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.api_base_url, "http://farm.local:5000");
}
