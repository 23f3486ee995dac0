//! Reference Data Port (Driven Port)

use crate::domain::metadata::InstrumentReference;

/// Port for static instrument attributes.
pub trait ReferenceDataSource: Send + Sync {
    /// Reference attributes for an instrument, if known.
    fn instrument_reference(&self, instrument: &str) -> Option<InstrumentReference>;
}
