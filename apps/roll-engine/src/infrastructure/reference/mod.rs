//! Reference Data Adapters

mod in_memory;

pub use in_memory::InMemoryReferenceData;
