//! Configuration loading and value resolution
//!
//! Values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment tiers are merged by the binary (clap `env`);
//! this module handles the TOML file and the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "AGRISENSE_CONFIG";

/// Environment variable carrying the weather service credential
pub const WEATHER_API_KEY_ENV: &str = "AGRISENSE_WEATHER_API_KEY";

/// Hardcoded weather credential used when nothing else is configured.
///
/// Shipping a credential in the binary is weak practice; resolution logs a
/// warning every time this value is selected.
pub const FALLBACK_WEATHER_API_KEY: &str = "agrisense-shared-demo-key";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the prediction service
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Current-weather endpoint URL
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// Weather service credential (optional, see [`resolve_weather_api_key`])
    #[serde(default)]
    pub weather_api_key: Option<String>,

    /// Initial unit system: "metric" or "imperial"
    #[serde(default = "default_unit")]
    pub default_unit: String,

    /// Request timeout in seconds. Unset means the HTTP client default (no timeout).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Preference file location override
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            weather_base_url: default_weather_base_url(),
            weather_api_key: None,
            default_unit: default_unit(),
            request_timeout_secs: None,
            preferences_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

fn default_unit() -> String {
    "metric".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Directory holding AgriSense config and preference files
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("agrisense"))
}

/// Default config file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Default preference file path for the platform
pub fn default_preferences_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("preferences.toml"))
}

/// Config file that [`load_toml_config`] reads, if any
///
/// An explicitly named file (argument or [`CONFIG_PATH_ENV`]) is returned
/// whether or not it exists. The platform default only when present.
pub fn config_source(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .or_else(|| default_config_path().filter(|path| path.exists()))
}

/// Load the TOML config
///
/// An explicitly named file (argument or [`CONFIG_PATH_ENV`]) must exist.
/// The platform default file is optional; when absent, built-in defaults apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match config_source(explicit) {
        Some(path) if !path.exists() => {
            Err(Error::Config(format!("Config file not found: {}", path.display())))
        }
        Some(path) => read_toml_config(&path),
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Read and parse one TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Toml,
    Fallback,
}

/// Resolve the weather credential
///
/// **Priority:** ENV → TOML → hardcoded fallback
pub fn resolve_weather_api_key(toml_config: &TomlConfig) -> (String, KeySource) {
    let env_key = std::env::var(WEATHER_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .weather_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Weather API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Weather API key loaded from environment variable");
        return (key, KeySource::Environment);
    }

    if let Some(key) = toml_key {
        info!("Weather API key loaded from TOML config");
        return (key, KeySource::Toml);
    }

    warn!(
        "No weather API key configured; using the built-in shared key. Set {} to use your own.",
        WEATHER_API_KEY_ENV
    );
    (FALLBACK_WEATHER_API_KEY.to_string(), KeySource::Fallback)
}
