//! Environment configuration: run name and data locations.

use serde::{Deserialize, Serialize};

/// Environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name.
    #[serde(default = "default_environment_name")]
    pub name: String,
    /// Directory holding input data.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Directory receiving roll calendars and metadata.
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: default_environment_name(),
            data_path: default_data_path(),
            output_path: default_output_path(),
        }
    }
}

fn default_environment_name() -> String {
    "DEV".to_string()
}

fn default_data_path() -> String {
    "data".to_string()
}

fn default_output_path() -> String {
    "output".to_string()
}
