//! Service configuration.
//!
//! T070: Implement ServiceConfig loading from TOML or JSON
//! T071: Implement config file discovery

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "AQUAMON_CONFIG";

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Device name reported alongside telemetry
    pub device_name: String,
    /// Seconds between collection cycles
    #[serde(default = "default_poll_period")]
    pub poll_period: u64,
    /// Tracing filter directive (e.g. "info", "aquamon=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Sensor entries, validated later by the sensor factory
    #[serde(default)]
    pub sensors: Vec<Value>,
}

fn default_poll_period() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Check the service-level fields. Sensor entries are validated by the factory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "device_name must be a non-empty string".to_string(),
            ));
        }
        if self.poll_period < 1 {
            return Err(ConfigError::Invalid("poll_period must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Time between collection cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_period)
    }

    /// Sensor entries as a list value, the input shape of `SensorFactory::build_all`.
    pub fn sensors_value(&self) -> Value {
        Value::Array(self.sensors.clone())
    }
}

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Get the platform configuration directory.
pub fn get_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "aquamon", "Aquamon").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the configuration file.
///
/// Order: `AQUAMON_CONFIG`, `./config.toml`, `./config.json`, then the platform config directory.
pub fn find_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(explicit);
        if path.is_file() {
            tracing::info!("Using {}={}", CONFIG_ENV_VAR, path.display());
            return Some(path);
        }
        tracing::warn!("{} set but not a file: {}", CONFIG_ENV_VAR, path.display());
    }

    let mut candidates = vec![PathBuf::from("config.toml"), PathBuf::from("config.json")];
    if let Some(dir) = get_config_dir() {
        candidates.push(dir.join("config.toml"));
        candidates.push(dir.join("config.json"));
    }

    let found = candidates.into_iter().find(|c| c.is_file());
    match &found {
        Some(path) => tracing::info!("Discovered config at {}", path.display()),
        None => tracing::warn!("No configuration file found via {} or defaults", CONFIG_ENV_VAR),
    }
    found
}

/// Load the service configuration from the discovered file.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    let path = find_config_path()
        .ok_or_else(|| ConfigError::NotFound(format!("set {} or create config.toml", CONFIG_ENV_VAR)))?;
    load_config_from(&path)
}

/// Load the service configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?,
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
        }
    };

    config.validate()?;

    tracing::debug!(
        "Loaded config for '{}' with {} sensor entries",
        config.device_name,
        config.sensors.len()
    );

    Ok(config)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
