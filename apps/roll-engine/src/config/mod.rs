//! Configuration module for the roll engine.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for every engine component.
//!
//! # Usage
//!
//! ```rust,ignore
//! use roll_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("output: {}", config.environment.output_path);
//! ```

mod batch;
mod environment;
mod observability;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use batch::BatchConfig;
pub use environment::EnvironmentConfig;
pub use observability::LoggingConfig;

pub use crate::domain::metadata::{InstrumentReference, QualityConfig, QualityWeights};
pub use crate::domain::roll::{ExpiryRollRule, RollParameterConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Environment configuration.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Data quality thresholds.
    #[serde(default)]
    pub data_quality: QualityConfig,
    /// Batch execution.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Market holidays on top of weekends.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Raw roll parameters keyed by instrument.
    #[serde(default)]
    pub roll_parameters: BTreeMap<String, RollParameterConfig>,
    /// Reference attributes keyed by instrument.
    #[serde(default)]
    pub instrument_overrides: BTreeMap<String, InstrumentReference>,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        let Some(var_name) = cap.get(1) else {
            return String::new();
        };
        match std::env::var(var_name.as_str()) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let quality = &config.data_quality;

    if !(0.0..=1.0).contains(&quality.min_data_quality_score) {
        return Err(ConfigError::ValidationError(
            "data_quality.min_data_quality_score must be between 0.0 and 1.0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&quality.max_missing_data_percent) {
        return Err(ConfigError::ValidationError(
            "data_quality.max_missing_data_percent must be between 0.0 and 1.0".to_string(),
        ));
    }

    let weights = quality.weights;
    if weights.coverage < 0.0 || weights.continuity < 0.0 || weights.volume < 0.0 {
        return Err(ConfigError::ValidationError(
            "data_quality.weights must not be negative".to_string(),
        ));
    }
    if weights.total() <= 0.0 {
        return Err(ConfigError::ValidationError(
            "data_quality.weights must sum to a positive value".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "logging.format must be one of: {valid_formats:?}"
        )));
    }

    if config.environment.output_path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "environment.output_path must not be empty".to_string(),
        ));
    }

    Ok(())
}
