//! Roll parameters taken from the `roll_parameters` config section.

use std::collections::BTreeMap;

use crate::application::ports::{RollParameterSource, SourceError};
use crate::config::Config;
use crate::domain::roll::RollParameterConfig;

/// Serves raw roll parameters keyed by upper-case instrument code.
///
/// Parameters are returned unvalidated; the build validates them per
/// instrument.
#[derive(Debug, Clone, Default)]
pub struct ConfigRollParameterSource {
    parameters: BTreeMap<String, RollParameterConfig>,
}

impl ConfigRollParameterSource {
    /// Create a source from a map of instrument to parameters.
    pub fn new(parameters: impl IntoIterator<Item = (String, RollParameterConfig)>) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(instrument, config)| (instrument.to_uppercase(), config))
                .collect(),
        }
    }

    /// Create a source from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.roll_parameters.clone())
    }

    /// Instruments with parameters, sorted.
    #[must_use]
    pub fn instruments(&self) -> Vec<String> {
        self.parameters.keys().cloned().collect()
    }
}

impl RollParameterSource for ConfigRollParameterSource {
    fn load(&self, instrument: &str) -> Result<RollParameterConfig, SourceError> {
        self.parameters
            .get(&instrument.to_uppercase())
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                instrument: instrument.to_string(),
            })
    }
}
