//! Build Instrument Use Case
//!
//! Loads one instrument through the ports, validates its roll parameters,
//! builds the roll calendar and aggregates its metadata.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};

use crate::application::ports::{
    HolidayCalendar, PanelPrices, PricePanelSource, ReferenceDataSource, RollParameterSource,
    SourceError,
};
use crate::application::services::{CacheKey, CalendarCache};
use crate::domain::contract::{Contract, ContractUniverse, PriceHistory, PriceRange};
use crate::domain::metadata::{InstrumentMetadata, MetadataAggregator, QualityConfig};
use crate::domain::roll::{RollCalendar, RollCalendarBuilder, RollParameters};
use crate::error::RollError;
use crate::telemetry::metrics::{
    record_build_failed, record_calendar_built, record_contracts_skipped,
};

/// Result of building one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentBuild {
    /// Instrument code.
    pub instrument: String,
    /// Snapshot version of the data used.
    pub snapshot_version: String,
    /// Roll calendar.
    pub calendar: Arc<RollCalendar>,
    /// Quality-scored metadata.
    pub metadata: InstrumentMetadata,
}

/// Use case for building one instrument's calendar and metadata.
pub struct BuildInstrumentUseCase<P, H, R, D>
where
    P: PricePanelSource,
    H: HolidayCalendar,
    R: RollParameterSource,
    D: ReferenceDataSource,
{
    panel: Arc<P>,
    holidays: Arc<H>,
    parameters: Arc<R>,
    reference: Arc<D>,
    quality: QualityConfig,
    cache: Option<Arc<CalendarCache>>,
}

impl<P, H, R, D> BuildInstrumentUseCase<P, H, R, D>
where
    P: PricePanelSource,
    H: HolidayCalendar,
    R: RollParameterSource,
    D: ReferenceDataSource,
{
    /// Create a new BuildInstrumentUseCase.
    pub fn new(
        panel: Arc<P>,
        holidays: Arc<H>,
        parameters: Arc<R>,
        reference: Arc<D>,
        quality: QualityConfig,
    ) -> Self {
        Self {
            panel,
            holidays,
            parameters,
            reference,
            quality,
            cache: None,
        }
    }

    /// Reuse calendars from a shared cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CalendarCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Any fatal [`RollError`] for the instrument. Recoverable data
    /// problems are reported as warnings on the calendar instead.
    pub fn execute(
        &self,
        instrument: &str,
        cancel: &CancellationToken,
    ) -> Result<InstrumentBuild, RollError> {
        let instrument = instrument.to_uppercase();
        let _span = info_span!("build_instrument", instrument = %instrument).entered();

        let result = self.build(&instrument, cancel);
        match &result {
            Ok(build) => {
                record_calendar_built(&instrument);
                record_contracts_skipped(
                    &instrument,
                    build.calendar.skipped_contracts().len() as u64,
                );
                info!(
                    rolls = build.calendar.events().len(),
                    warnings = build.calendar.warnings().len(),
                    quality_score = build.metadata.quality.score,
                    "Instrument built"
                );
            }
            Err(err) => {
                record_build_failed(&instrument, err.reason());
                warn!(error = %err, category = %err.category(), "Instrument build failed");
            }
        }
        result
    }

    fn build(
        &self,
        instrument: &str,
        cancel: &CancellationToken,
    ) -> Result<InstrumentBuild, RollError> {
        let raw = self
            .parameters
            .load(instrument)
            .map_err(|err| match err {
                SourceError::NotFound { .. } => RollError::UnknownInstrument {
                    instrument: instrument.to_string(),
                },
                other => RollError::InvalidRollParameters {
                    instrument: instrument.to_string(),
                    rule: other.to_string(),
                },
            })?;
        let params = RollParameters::from_config(instrument, &raw)?;

        let (universe, history) = self.load_contracts(instrument, &params, cancel)?;
        let snapshot_version = self.panel.snapshot_version(instrument);
        let key = CacheKey::new(instrument, snapshot_version.clone()).with_inputs(format!(
            "{}#{}",
            params.fingerprint(),
            self.holidays.identity()
        ));

        let cached = self.cache.as_ref().and_then(|cache| cache.get(&key));
        let calendar = if let Some(calendar) = cached {
            debug!(version = %snapshot_version, "Using cached roll calendar");
            calendar
        } else {
            let prices = PanelPrices(self.panel.as_ref());
            let built = Arc::new(
                RollCalendarBuilder::new(self.holidays.as_ref(), &prices, &params)
                    .build(&universe, cancel)?,
            );
            if let Some(cache) = &self.cache {
                cache.insert(key, Arc::clone(&built));
            }
            built
        };

        let reference = self
            .reference
            .instrument_reference(instrument)
            .unwrap_or_default();
        let metadata = MetadataAggregator::new(self.holidays.as_ref(), &self.quality)
            .aggregate(&calendar, &universe, &history, reference);

        Ok(InstrumentBuild {
            instrument: instrument.to_string(),
            snapshot_version,
            calendar,
            metadata,
        })
    }

    /// Register the instrument's contracts and load their prices.
    fn load_contracts(
        &self,
        instrument: &str,
        params: &RollParameters,
        cancel: &CancellationToken,
    ) -> Result<(ContractUniverse, PriceHistory), RollError> {
        let listings = self
            .panel
            .list_contracts(instrument)
            .map_err(|err| match err {
                SourceError::NotFound { .. } => RollError::NoContracts {
                    instrument: instrument.to_string(),
                },
                other => RollError::PriceSource {
                    instrument: instrument.to_string(),
                    message: other.to_string(),
                },
            })?;

        let mut universe = ContractUniverse::new();
        let mut history = PriceHistory::new();
        for listing in listings {
            if cancel.is_cancelled() {
                return Err(RollError::Cancelled {
                    instrument: instrument.to_string(),
                });
            }
            let id = listing.id;
            if id.instrument() != instrument {
                continue;
            }

            let expiry = listing
                .expiry
                .or_else(|| Contract::approximate_expiry(id.year(), id.month(), params.expiry_offset()))
                .ok_or_else(|| RollError::InvalidContractSymbol {
                    symbol: id.symbol(),
                    message: "no expiry date can be derived".to_string(),
                })?;

            let observations = self.panel.observations(&id);
            let range = self
                .panel
                .price_range(&id)
                .map(|(first, last)| PriceRange { first, last });

            universe.register(
                Contract::new(id.clone(), expiry)
                    .with_first_notice(listing.first_notice)
                    .with_prices(range, observations.len()),
            )?;
            history.insert(id, observations);
        }

        debug!(contracts = universe.contract_count(instrument), "Contracts loaded");
        Ok((universe, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ContractListing, MockRollParameterSource};
    use crate::domain::contract::{ContractId, MonthCode, PriceObservation};
    use crate::domain::roll::RollParameterConfig;
    use crate::infrastructure::{InMemoryPricePanel, InMemoryReferenceData, WeekdayHolidayCalendar};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekday_prices(from: NaiveDate, until: NaiveDate) -> Vec<PriceObservation> {
        let calendar = WeekdayHolidayCalendar::default();
        from.iter_days()
            .take_while(|date| *date <= until)
            .filter(|date| calendar.is_business_day(*date))
            .map(|date| PriceObservation::new(date, dec!(100)).with_volume(500))
            .collect()
    }

    fn panel() -> InMemoryPricePanel {
        let mut panel = InMemoryPricePanel::new();
        for (month, expiry, first) in [
            (MonthCode::H, d(2025, 3, 21), d(2024, 12, 2)),
            (MonthCode::M, d(2025, 6, 20), d(2025, 1, 2)),
            (MonthCode::U, d(2025, 9, 19), d(2025, 3, 3)),
        ] {
            panel.insert(
                ContractListing {
                    id: ContractId::new("ES", 2025, month),
                    expiry: Some(expiry),
                    first_notice: None,
                },
                weekday_prices(first, expiry),
            );
        }
        panel
    }

    type TestUseCase = BuildInstrumentUseCase<
        InMemoryPricePanel,
        WeekdayHolidayCalendar,
        MockRollParameterSource,
        InMemoryReferenceData,
    >;

    fn use_case(parameters: MockRollParameterSource) -> TestUseCase {
        use_case_with(panel(), parameters)
    }

    fn use_case_with(panel: InMemoryPricePanel, parameters: MockRollParameterSource) -> TestUseCase {
        BuildInstrumentUseCase::new(
            Arc::new(panel),
            Arc::new(WeekdayHolidayCalendar::default()),
            Arc::new(parameters),
            Arc::new(InMemoryReferenceData::default()),
            QualityConfig::default(),
        )
    }

    #[test]
    fn test_missing_parameters_is_unknown_instrument() {
        let mut parameters = MockRollParameterSource::new();
        parameters.expect_load().returning(|instrument| {
            Err(SourceError::NotFound {
                instrument: instrument.to_string(),
            })
        });

        let err = use_case(parameters)
            .execute("es", &CancellationToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            RollError::UnknownInstrument {
                instrument: "ES".to_string()
            }
        );
    }

    #[test]
    fn test_unreadable_parameters_are_invalid() {
        let mut parameters = MockRollParameterSource::new();
        parameters.expect_load().returning(|_| {
            Err(SourceError::Malformed {
                message: "bad yaml".to_string(),
            })
        });

        let err = use_case(parameters)
            .execute("ES", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, RollError::InvalidRollParameters { .. }));
    }

    #[test]
    fn test_held_cycle_not_covering_priced_is_rejected() {
        let mut parameters = MockRollParameterSource::new();
        parameters.expect_load().returning(|_| {
            let mut config = RollParameterConfig::new("HMUZ", -5, -1);
            config.hold_rollcycle = "HU".to_string();
            Ok(config)
        });

        let err = use_case(parameters)
            .execute("ES", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, RollError::InvalidRollParameters { .. }));
    }

    #[test]
    fn test_build_reuses_cached_calendar() {
        let mut parameters = MockRollParameterSource::new();
        parameters
            .expect_load()
            .times(2)
            .returning(|_| Ok(RollParameterConfig::new("HMUZ", -5, -1)));
        let cache = Arc::new(CalendarCache::new());
        let use_case = use_case(parameters).with_cache(Arc::clone(&cache));

        let first = use_case.execute("ES", &CancellationToken::new()).unwrap();
        let second = use_case.execute("ES", &CancellationToken::new()).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first.calendar, &second.calendar));
        let dates: Vec<NaiveDate> = first.calendar.events().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2025, 3, 14), d(2025, 6, 13)]);
        assert_eq!(first.metadata.contract_count, 3);
    }

    #[test]
    fn test_parameter_change_is_not_served_from_cache() {
        let cache = Arc::new(CalendarCache::new());
        let build_with_offset = |offset: i32| {
            let mut parameters = MockRollParameterSource::new();
            parameters
                .expect_load()
                .returning(move |_| Ok(RollParameterConfig::new("HMUZ", offset, -1)));
            use_case(parameters)
                .with_cache(Arc::clone(&cache))
                .execute("ES", &CancellationToken::new())
                .unwrap()
        };

        let five = build_with_offset(-5);
        let ten = build_with_offset(-10);

        assert_eq!(five.snapshot_version, ten.snapshot_version);
        assert_eq!(five.calendar.events()[0].date, d(2025, 3, 14));
        assert_eq!(ten.calendar.events()[0].date, d(2025, 3, 7));
    }

    #[test]
    fn test_conflicting_listings_are_duplicate_contract() {
        let mut panel = panel();
        panel.insert(
            ContractListing {
                id: ContractId::new("ES", 2025, MonthCode::H),
                expiry: Some(d(2025, 3, 14)),
                first_notice: None,
            },
            weekday_prices(d(2024, 12, 2), d(2025, 3, 14)),
        );
        let mut parameters = MockRollParameterSource::new();
        parameters
            .expect_load()
            .returning(|_| Ok(RollParameterConfig::new("HMUZ", -5, -1)));

        let err = use_case_with(panel, parameters)
            .execute("ES", &CancellationToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            RollError::DuplicateContract {
                contract: ContractId::new("ES", 2025, MonthCode::H),
                existing: d(2025, 3, 21),
                conflicting: d(2025, 3, 14),
            }
        );
    }

    #[test]
    fn test_unknown_panel_instrument_has_no_contracts() {
        let mut parameters = MockRollParameterSource::new();
        parameters
            .expect_load()
            .returning(|_| Ok(RollParameterConfig::new("HMUZ", -5, -1)));

        let err = use_case(parameters)
            .execute("CL", &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, RollError::NoContracts { .. }));
    }

    #[test]
    fn test_cancelled_build() {
        let mut parameters = MockRollParameterSource::new();
        parameters
            .expect_load()
            .returning(|_| Ok(RollParameterConfig::new("HMUZ", -5, -1)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = use_case(parameters).execute("ES", &cancel).unwrap_err();
        assert!(matches!(err, RollError::Cancelled { .. }));
    }
}
