//! In-memory reference data.

use std::collections::BTreeMap;

use crate::application::ports::ReferenceDataSource;
use crate::config::Config;
use crate::domain::metadata::InstrumentReference;

/// Reference attributes keyed by upper-case instrument code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    references: BTreeMap<String, InstrumentReference>,
}

impl InMemoryReferenceData {
    /// Create a source from a map of instrument to attributes.
    pub fn new(references: impl IntoIterator<Item = (String, InstrumentReference)>) -> Self {
        Self {
            references: references
                .into_iter()
                .map(|(instrument, reference)| (instrument.to_uppercase(), reference))
                .collect(),
        }
    }

    /// Create a source from the `instrument_overrides` config section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.instrument_overrides.clone())
    }

    /// Number of instruments with reference data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether no reference data is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl ReferenceDataSource for InMemoryReferenceData {
    fn instrument_reference(&self, instrument: &str) -> Option<InstrumentReference> {
        self.references.get(&instrument.to_uppercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_lookup() {
        let reference = InstrumentReference {
            exchange: "NYMEX".to_string(),
            ..InstrumentReference::default()
        };
        let source = InMemoryReferenceData::new([("cl".to_string(), reference)]);

        assert_eq!(source.len(), 1);
        assert_eq!(source.instrument_reference("CL").unwrap().exchange, "NYMEX");
        assert!(source.instrument_reference("ES").is_none());
    }
}
