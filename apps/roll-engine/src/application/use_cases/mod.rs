//! Application use cases.

mod batch;
mod build_instrument;
mod tally;

pub use batch::{BatchError, BatchReport, BatchRunner, InstrumentOutcome};
pub use build_instrument::{BuildInstrumentUseCase, InstrumentBuild};
pub use tally::{BatchSummary, BatchTally};
