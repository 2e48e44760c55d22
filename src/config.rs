//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

/// 6-DOF input device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Maximum raw deflection reported by the device. Needs calibration per
    /// device model; 0.075 matches the 3Dconnexion SpaceNavigator.
    #[serde(default = "default_normalization_scale")]
    pub normalization_scale: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty means log to stderr only.
    #[serde(default)]
    pub directory: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

/// Command recorder configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecorderConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_recorder_path")]
    pub path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            normalization_scale: default_normalization_scale(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_recorder_path(),
        }
    }
}

// Default value functions
fn default_normalization_scale() -> f64 { 0.075 }

fn default_log_level() -> String { "info".to_string() }
fn default_file_prefix() -> String { "sixdof-relay.log".to_string() }

fn default_recorder_path() -> String { "./logs/commands.jsonl".to_string() }

/// Log levels accepted by `logging.level`
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `device.normalization_scale`
const MAX_NORMALIZATION_SCALE: f64 = 10.0;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sixdof_relay::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let scale = self.device.normalization_scale;
        if !scale.is_finite() || scale <= 0.0 || scale > MAX_NORMALIZATION_SCALE {
            return Err(crate::error::RelayError::Config(
                toml::de::Error::custom("normalization_scale must be greater than 0.0 and at most 10.0")
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(crate::error::RelayError::Config(
                toml::de::Error::custom(format!(
                    "logging level must be one of: {}",
                    LOG_LEVELS.join(", ")
                ))
            ));
        }

        if !self.logging.directory.is_empty() && self.logging.file_prefix.is_empty() {
            return Err(crate::error::RelayError::Config(
                toml::de::Error::custom("logging file_prefix cannot be empty when directory is set")
            ));
        }

        if self.recorder.enabled && self.recorder.path.is_empty() {
            return Err(crate::error::RelayError::Config(
                toml::de::Error::custom("recorder path cannot be empty when enabled")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.normalization_scale, 0.075);
        assert!(!config.recorder.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[device]
normalization_scale = 0.35

[logging]
level = "debug"

[recorder]
enabled = true
path = "/tmp/commands.jsonl"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = tokio_test::assert_ok!(Config::load(temp_file.path()));
        assert_eq!(config.device.normalization_scale, 0.35);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file_prefix, "sixdof-relay.log");
        assert!(config.recorder.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.device.normalization_scale, default_normalization_scale());
        assert_eq!(config.logging.level, default_log_level());
        assert_eq!(config.recorder.path, default_recorder_path());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/sixdof-relay.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[device\nnormalization_scale = ");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_normalization_scale_zero() {
        let mut config = Config::default();
        config.device.normalization_scale = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalization_scale_negative() {
        let mut config = Config::default();
        config.device.normalization_scale = -0.075;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalization_scale_too_high() {
        let mut config = Config::default();
        config.device.normalization_scale = 10.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalization_scale_nan() {
        let mut config = Config::default();
        config.device.normalization_scale = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_empty_file_prefix_with_directory() {
        let mut config = Config::default();
        config.logging.directory = "./logs".to_string();
        config.logging.file_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_recorder_path_when_enabled() {
        let mut config = Config::default();
        config.recorder.enabled = true;
        config.recorder.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_recorder_path_when_disabled() {
        let mut config = Config::default();
        config.recorder.enabled = false;
        config.recorder.path = String::new();
        assert!(config.validate().is_ok());
    }
}
