//! Instance configuration and config-file loading shared by every parla crate

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Log level used when nothing else is configured
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstanceConfig {
    /// Instance name, shown in logs
    pub name: String,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: "parla".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl InstanceConfig {
    /// Apply environment overrides (`PARLA_INSTANCE_NAME`, `PARLA_LOG_LEVEL`)
    pub fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("PARLA_INSTANCE_NAME") {
            if !name.trim().is_empty() {
                self.name = name;
            }
        }

        if let Ok(level) = std::env::var("PARLA_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("Instance name cannot be empty".to_string());
        }
        if self.name.len() > 128 {
            return Err("Instance name too long (max 128 chars)".to_string());
        }

        let level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Unknown log level '{}' (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}

/// Parse configuration content. JSON is tried first, then TOML, then YAML.
pub fn load_from_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    if let Ok(config) = serde_json::from_str::<T>(content) {
        debug!("Configuration parsed as JSON");
        return Ok(config);
    }

    if let Ok(config) = toml::from_str::<T>(content) {
        debug!("Configuration parsed as TOML");
        return Ok(config);
    }

    match serde_yaml::from_str::<T>(content) {
        Ok(config) => {
            debug!("Configuration parsed as YAML");
            Ok(config)
        }
        Err(e) => Err(Error::Deserialization(format!(
            "Configuration is not valid JSON, TOML or YAML: {}",
            e
        ))),
    }
}

/// Load configuration from a file. Paths containing traversal sequences are rejected.
pub fn load_from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if display.contains("..") || display.contains("//") || display.contains("\\\\") {
        return Err(Error::Configuration(format!(
            "Path traversal detected: '{}'",
            display
        )));
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(Error::Configuration(format!(
            "Configuration file is empty: '{}'",
            display
        )));
    }

    load_from_str(&content)
}

/// Output format for rendering a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

/// Render a configuration in the given format
pub fn render<T: Serialize>(config: &T, format: ConfigFormat) -> Result<String> {
    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
    };
    rendered.map_err(Error::Serialization)
}
