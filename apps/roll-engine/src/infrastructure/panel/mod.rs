//! Price Panel Adapters

mod in_memory;

pub use in_memory::{InMemoryPricePanel, PanelContract, PanelSnapshot};
