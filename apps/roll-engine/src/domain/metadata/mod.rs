//! Metadata Bounded Context
//!
//! Instrument reference attributes, data quality scoring and the
//! aggregation of both with per-contract rows.

mod aggregator;
mod quality;
mod reference;

pub use aggregator::{ContractMetadata, InstrumentMetadata, MetadataAggregator};
pub use quality::{QualityConfig, QualityScore, QualityWeights, SeriesStats};
pub use reference::InstrumentReference;
