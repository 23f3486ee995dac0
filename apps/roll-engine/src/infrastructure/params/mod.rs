//! Roll Parameter Adapters

mod config_source;

pub use config_source::ConfigRollParameterSource;
