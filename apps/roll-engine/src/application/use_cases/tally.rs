//! Running outcome counts for batch builds.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ErrorCategory;

use super::batch::InstrumentOutcome;

const CATEGORIES: [ErrorCategory; 4] = [
    ErrorCategory::Configuration,
    ErrorCategory::Data,
    ErrorCategory::Consistency,
    ErrorCategory::Cancelled,
];

/// Outcome counts shared by batch workers.
#[derive(Debug)]
pub struct BatchTally {
    total: usize,
    succeeded: AtomicUsize,
    by_category: [AtomicUsize; 4],
    skipped_contracts: AtomicUsize,
    warnings: AtomicUsize,
}

impl BatchTally {
    /// Create a tally for `total` instruments.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: AtomicUsize::new(0),
            by_category: Default::default(),
            skipped_contracts: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    /// Count a finished instrument. Returns how many have finished so far.
    pub fn record(&self, outcome: &InstrumentOutcome) -> usize {
        match &outcome.result {
            Ok(build) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                self.skipped_contracts.fetch_add(
                    build.calendar.skipped_contracts().len(),
                    Ordering::Relaxed,
                );
                self.warnings
                    .fetch_add(build.calendar.warnings().len(), Ordering::Relaxed);
            }
            Err(err) => {
                self.by_category[slot(err.category())].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.finished()
    }

    /// Instruments finished so far.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
            + self
                .by_category
                .iter()
                .map(|count| count.load(Ordering::Relaxed))
                .sum::<usize>()
    }

    /// Instruments in the batch.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Counts so far.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let failures_by_category: BTreeMap<ErrorCategory, usize> = CATEGORIES
            .iter()
            .map(|category| (*category, self.by_category[slot(*category)].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        let cancelled = failures_by_category
            .get(&ErrorCategory::Cancelled)
            .copied()
            .unwrap_or(0);
        let failed = failures_by_category.values().sum::<usize>() - cancelled;

        BatchSummary {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed,
            cancelled,
            failures_by_category,
            skipped_contracts: self.skipped_contracts.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }
}

const fn slot(category: ErrorCategory) -> usize {
    match category {
        ErrorCategory::Configuration => 0,
        ErrorCategory::Data => 1,
        ErrorCategory::Consistency => 2,
        ErrorCategory::Cancelled => 3,
    }
}

/// Outcome counts for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Successful builds.
    pub succeeded: usize,
    /// Failed builds, excluding cancellations.
    pub failed: usize,
    /// Cancelled builds.
    pub cancelled: usize,
    /// Unsuccessful builds by error category, cancellations included.
    pub failures_by_category: BTreeMap<ErrorCategory, usize>,
    /// Distinct contracts dropped across successful builds.
    pub skipped_contracts: usize,
    /// Warnings across successful builds.
    pub warnings: usize,
}
