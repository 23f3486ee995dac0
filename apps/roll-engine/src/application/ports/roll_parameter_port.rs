//! Roll Parameter Port (Driven Port)

use crate::domain::roll::RollParameterConfig;

use super::SourceError;

/// Port for loading raw roll parameters.
#[cfg_attr(test, mockall::automock)]
pub trait RollParameterSource: Send + Sync {
    /// Raw parameters for an instrument; [`SourceError::NotFound`] if none.
    fn load(&self, instrument: &str) -> Result<RollParameterConfig, SourceError>;
}
