// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Roll Engine - Rust Core Library
//!
//! Builds futures roll calendars and contract metadata from per-contract
//! price panels.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic, free of I/O
//!   - `contract`: Contract identities, dated contracts, price histories
//!   - `roll`: Roll cycles, roll parameters, roll dates, roll calendars
//!   - `metadata`: Instrument/contract metadata and data-quality scoring
//!   - `calendar`: Business-day arithmetic over a holiday calendar
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for price panels, parameters and reference data
//!   - `services`: Calendar cache keyed by data snapshot version
//!   - `use_cases`: `BuildInstrument` and the parallel `BatchRunner`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `panel`: In-memory price panel loaded from JSON
//!   - `calendar`: Weekday holiday calendar
//!   - `params` / `reference`: Config-backed parameter and reference sources
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roll_engine::application::use_cases::BuildInstrumentUseCase;
//! use tokio_util::sync::CancellationToken;
//!
//! let use_case = BuildInstrumentUseCase::new(panel, holidays, parameters, reference, quality);
//! let build = use_case.execute("ES", &CancellationToken::new())?;
//! for record in build.calendar.records() {
//!     println!("{} {}", record.date, record.priced_contract);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters for the application ports.
pub mod infrastructure;

// =============================================================================
// Cross-cutting Concerns
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error taxonomy.
pub mod error;

/// Logging and metrics.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use domain::contract::{Contract, ContractId, ContractUniverse, MonthCode, PriceObservation};
pub use domain::metadata::{InstrumentMetadata, MetadataAggregator, QualityScore};
pub use domain::roll::{
    RollCalendar, RollCalendarBuilder, RollCalendarRecord, RollCycle, RollParameters, RollWarning,
};
pub use error::{ErrorCategory, RollError};

pub use application::use_cases::{BatchReport, BatchRunner, BuildInstrumentUseCase, InstrumentBuild};
pub use infrastructure::{
    ConfigRollParameterSource, InMemoryPricePanel, InMemoryReferenceData, WeekdayHolidayCalendar,
};
