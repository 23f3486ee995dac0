//! Shared cache of built roll calendars.
//!
//! Keyed by instrument, data snapshot version and a fingerprint of the
//! other build inputs, so a calendar is reused only while the prices,
//! roll parameters and holiday calendar it was built from are unchanged.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::domain::roll::RollCalendar;
use crate::telemetry::metrics::{record_cache_hit, record_cache_miss};

/// Cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Instrument code.
    pub instrument: String,
    /// Snapshot version of the instrument's data.
    pub snapshot_version: String,
    /// Roll parameter and holiday calendar fingerprint.
    pub inputs: String,
}

impl CacheKey {
    /// Create a key.
    #[must_use]
    pub fn new(instrument: impl Into<String>, snapshot_version: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            snapshot_version: snapshot_version.into(),
            inputs: String::new(),
        }
    }

    /// Set the fingerprint of the non-price build inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = inputs.into();
        self
    }
}

/// Thread-safe calendar cache owned by the caller.
#[derive(Debug, Default)]
pub struct CalendarCache {
    entries: RwLock<HashMap<CacheKey, Arc<RollCalendar>>>,
}

impl CalendarCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached calendar for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RollCalendar>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let hit = entries.get(key).cloned();
        if hit.is_some() {
            record_cache_hit();
        } else {
            record_cache_miss();
        }
        hit
    }

    /// Store a calendar, dropping older versions of the same instrument.
    pub fn insert(&self, key: CacheKey, calendar: Arc<RollCalendar>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|existing, _| existing.instrument != key.instrument);
        debug!(instrument = %key.instrument, version = %key.snapshot_version, "Caching roll calendar");
        entries.insert(key, calendar);
    }

    /// Remove every version of an instrument.
    pub fn invalidate_instrument(&self, instrument: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.instrument != instrument);
    }

    /// Number of cached calendars.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
