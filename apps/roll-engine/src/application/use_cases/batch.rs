//! Parallel batch builds using Rayon.
//!
//! Each instrument is built independently; one instrument's failure never
//! aborts the others unless `continue_on_error` is off, in which case the
//! first fatal error cancels the instruments not yet finished.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::ports::{
    HolidayCalendar, PricePanelSource, ReferenceDataSource, RollParameterSource,
};
use crate::config::BatchConfig;
use crate::error::{ErrorCategory, RollError};

use super::build_instrument::{BuildInstrumentUseCase, InstrumentBuild};
use super::tally::BatchTally;

/// Errors from batch execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPool {
        /// Error message.
        message: String,
    },

    /// Nothing to build.
    #[error("No instruments provided")]
    NoInstruments,
}

/// Outcome for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentOutcome {
    /// Instrument code.
    pub instrument: String,
    /// Build result.
    pub result: Result<InstrumentBuild, RollError>,
    /// Build time.
    pub elapsed_ms: u64,
}

impl InstrumentOutcome {
    /// Whether the build succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether the build was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(&self.result, Err(err) if err.category() == ErrorCategory::Cancelled)
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// One outcome per instrument, in input order.
    pub outcomes: Vec<InstrumentOutcome>,
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
    /// Wall time.
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Successful builds.
    pub fn successes(&self) -> impl Iterator<Item = &InstrumentBuild> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed builds with their errors, cancellations included.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &RollError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.instrument.as_str(), e)))
    }
}

/// Runs [`BuildInstrumentUseCase`] for many instruments.
pub struct BatchRunner<P, H, R, D>
where
    P: PricePanelSource,
    H: HolidayCalendar,
    R: RollParameterSource,
    D: ReferenceDataSource,
{
    use_case: Arc<BuildInstrumentUseCase<P, H, R, D>>,
    config: BatchConfig,
}

impl<P, H, R, D> BatchRunner<P, H, R, D>
where
    P: PricePanelSource,
    H: HolidayCalendar,
    R: RollParameterSource,
    D: ReferenceDataSource,
{
    /// Create a new batch runner.
    pub fn new(use_case: Arc<BuildInstrumentUseCase<P, H, R, D>>, config: BatchConfig) -> Self {
        Self { use_case, config }
    }

    /// Build every instrument.
    ///
    /// # Errors
    ///
    /// Returns error if no instruments are given or the thread pool cannot
    /// be created. Per-instrument failures are reported in the
    /// [`BatchReport`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn run(
        &self,
        instruments: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        if instruments.is_empty() {
            return Err(BatchError::NoInstruments);
        }

        let run_id = Uuid::new_v4();
        let tally = BatchTally::new(instruments.len());
        let start_time = Instant::now();

        info!(
            %run_id,
            instruments = instruments.len(),
            threads = self.effective_thread_count(),
            "Starting batch build"
        );

        let outcomes = if instruments.len() >= self.config.min_parallel_jobs {
            if self.config.max_threads > 0 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.max_threads)
                    .build()
                    .map_err(|e| BatchError::ThreadPool {
                        message: e.to_string(),
                    })?;
                pool.install(|| self.run_parallel(instruments, &tally, cancel))
            } else {
                self.run_parallel(instruments, &tally, cancel)
            }
        } else {
            self.run_sequential(instruments, &tally, cancel)
        };

        let elapsed = start_time.elapsed();
        let summary = tally.summary();

        info!(
            %run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            skipped_contracts = summary.skipped_contracts,
            elapsed_secs = elapsed.as_secs_f64(),
            "Batch build complete"
        );

        Ok(BatchReport {
            run_id,
            outcomes,
            succeeded: summary.succeeded,
            failed: summary.failed,
            cancelled: summary.cancelled,
            failures_by_category: summary.failures_by_category,
            skipped_contracts: summary.skipped_contracts,
            warnings: summary.warnings,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    fn run_parallel(
        &self,
        instruments: &[String],
        tally: &BatchTally,
        cancel: &CancellationToken,
    ) -> Vec<InstrumentOutcome> {
        instruments
            .par_iter()
            .map(|instrument| self.execute_counted(instrument, tally, cancel))
            .collect()
    }

    fn run_sequential(
        &self,
        instruments: &[String],
        tally: &BatchTally,
        cancel: &CancellationToken,
    ) -> Vec<InstrumentOutcome> {
        instruments
            .iter()
            .map(|instrument| self.execute_counted(instrument, tally, cancel))
            .collect()
    }

    fn execute_counted(
        &self,
        instrument: &str,
        tally: &BatchTally,
        cancel: &CancellationToken,
    ) -> InstrumentOutcome {
        let outcome = self.execute(instrument, cancel);
        let finished = tally.record(&outcome);
        if self.config.track_progress {
            debug!(
                instrument = %outcome.instrument,
                success = outcome.is_success(),
                finished,
                total = tally.total(),
                "Instrument finished"
            );
        }
        outcome
    }

    #[allow(clippy::cast_possible_truncation)]
    fn execute(&self, instrument: &str, cancel: &CancellationToken) -> InstrumentOutcome {
        let start = Instant::now();
        let result = if cancel.is_cancelled() {
            Err(RollError::Cancelled {
                instrument: instrument.to_uppercase(),
            })
        } else {
            self.use_case.execute(instrument, cancel)
        };

        if !self.config.continue_on_error
            && matches!(&result, Err(err) if err.category() != ErrorCategory::Cancelled)
        {
            cancel.cancel();
        }

        InstrumentOutcome {
            instrument: instrument.to_uppercase(),
            result,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Threads used for parallel builds.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        if self.config.max_threads > 0 {
            self.config.max_threads
        } else {
            rayon::current_num_threads()
        }
    }
}
