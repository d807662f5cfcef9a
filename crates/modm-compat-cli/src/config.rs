//! Configuration for modm-translate
//!
//! Loads configuration from:
//! 1. config.yaml - catalog location, output and logging settings
//! 2. .env file - picked up by `dotenvy` before loading
//!
//! Environment variables always override config.yaml values; command-line
//! flags override both.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Where model metadata comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// YAML catalog loaded on top of the built-in models
    #[serde(default)]
    pub path: Option<String>,

    /// Model used when `--model` is not given
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ORM keyword syntax, e.g. `Q(tags__contains=['foo'])`
    #[default]
    Text,
    /// Filter tree as JSON
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::DEFAULT_FILTER.to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MODM_CATALOG") {
            self.catalog.path = Some(path);
        }
        if let Ok(model) = std::env::var("MODM_MODEL") {
            self.catalog.default_model = Some(model);
        }
        if let Ok(format) = std::env::var("MODM_OUTPUT_FORMAT") {
            if let Some(format) = OutputFormat::parse(&format) {
                self.output.format = format;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.catalog.path.is_none());
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.level, "warn,modm_compat=info,modm_translate=info");
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.logging.output, "stderr");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("output:\n  format: json\n").unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.directory, "./logs");
    }

    #[test]
    fn test_env_var_override() {
        std::env::set_var("MODM_MODEL", "Preprint");
        std::env::set_var("MODM_OUTPUT_FORMAT", "JSON");

        let config_yaml = r#"
catalog:
  path: "./catalog.yaml"
  default_model: "Node"
output:
  format: text
"#;
        let temp_file = std::env::temp_dir().join("modm_translate_test_config.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.catalog.path.as_deref(), Some("./catalog.yaml"));
        assert_eq!(config.catalog.default_model.as_deref(), Some("Preprint")); // Overridden
        assert_eq!(config.output.format, OutputFormat::Json); // Overridden

        std::env::remove_var("MODM_MODEL");
        std::env::remove_var("MODM_OUTPUT_FORMAT");
        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("modm_translate_no_such_config.yaml");
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.logging.directory, "./logs");
    }
}
