//! In-memory price panel.
//!
//! Holds listings and observations for any number of instruments. A panel
//! can be loaded from a JSON snapshot:
//!
//! ```json
//! {
//!   "version": "2025-06-30",
//!   "contracts": [
//!     {
//!       "contract": "ESH25",
//!       "expiry": "2025-03-21",
//!       "observations": [{ "date": "2025-03-03", "price": "5850.25", "volume": 1200 }]
//!     }
//!   ]
//! }
//! ```
//!
//! `contract` accepts either the canonical `ES/202503` key or an exchange
//! ticker. Without a `version`, each instrument's snapshot version is the
//! SHA-256 digest of its listings and observations.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::application::ports::{ContractListing, PricePanelSource, SourceError};
use crate::domain::contract::{ContractId, PriceObservation};

/// Year used to resolve single-digit tickers when nothing better is known.
const DEFAULT_PIVOT_YEAR: i32 = 2000;

/// Serialized form of a price panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelSnapshot {
    /// Data version shared by every instrument in the snapshot.
    #[serde(default)]
    pub version: Option<String>,
    /// Contracts with their observations.
    #[serde(default)]
    pub contracts: Vec<PanelContract>,
}

/// One contract in a [`PanelSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelContract {
    /// Contract key or exchange ticker.
    pub contract: String,
    /// Expiry date, if known.
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// First notice date, if known.
    #[serde(default)]
    pub first_notice: Option<NaiveDate>,
    /// Daily observations.
    #[serde(default)]
    pub observations: Vec<PriceObservation>,
}

impl PanelContract {
    fn contract_id(&self) -> Result<ContractId, SourceError> {
        if let Ok(id) = self.contract.parse::<ContractId>() {
            return Ok(id);
        }
        let pivot = self
            .expiry
            .or_else(|| self.observations.first().map(|o| o.date))
            .map_or(DEFAULT_PIVOT_YEAR, |date| date.year());
        ContractId::parse_symbol(&self.contract, pivot).map_err(|err| SourceError::Malformed {
            message: err.to_string(),
        })
    }
}

/// Price panel held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricePanel {
    version: Option<String>,
    listings: BTreeMap<String, Vec<ContractListing>>,
    series: HashMap<ContractId, Vec<PriceObservation>>,
}

impl InMemoryPricePanel {
    /// Create an empty panel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the snapshot version reported for every instrument.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a contract. Observations are sorted by date and a later
    /// observation for the same date wins.
    ///
    /// Re-inserting an identity with the same expiry replaces it. A
    /// conflicting expiry keeps both listings and merges the observations,
    /// so registering the listings fails with `DuplicateContract`.
    pub fn insert(&mut self, listing: ContractListing, observations: Vec<PriceObservation>) {
        let id = listing.id.clone();
        let listings = self
            .listings
            .entry(id.instrument().to_string())
            .or_default();

        let mut by_date = BTreeMap::new();
        let conflicting = listings
            .iter()
            .any(|existing| existing.id == id && existing.expiry != listing.expiry);
        if conflicting {
            warn!(contract = %id, expiry = ?listing.expiry, "Conflicting listing for contract");
            for observation in self.series.remove(&id).unwrap_or_default() {
                by_date.insert(observation.date, observation);
            }
        } else {
            listings.retain(|existing| existing.id != id);
        }
        listings.push(listing);

        for observation in observations {
            by_date.insert(observation.date, observation);
        }
        self.series.insert(id, by_date.into_values().collect());
    }

    /// Build a panel from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Malformed` if a contract cannot be identified.
    pub fn from_snapshot(snapshot: PanelSnapshot) -> Result<Self, SourceError> {
        let mut panel = Self {
            version: snapshot.version,
            ..Self::default()
        };
        for contract in snapshot.contracts {
            let id = contract.contract_id()?;
            let listing = ContractListing {
                id,
                expiry: contract.expiry,
                first_notice: contract.first_notice,
            };
            panel.insert(listing, contract.observations);
        }
        debug!(
            instruments = panel.listings.len(),
            contracts = panel.series.len(),
            "Price panel loaded"
        );
        Ok(panel)
    }

    /// Parse a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Malformed` on invalid JSON or contracts.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let snapshot: PanelSnapshot =
            serde_json::from_str(json).map_err(|e| SourceError::Malformed {
                message: e.to_string(),
            })?;
        Self::from_snapshot(snapshot)
    }

    /// Read a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Unavailable` if the file cannot be read and
    /// `SourceError::Malformed` if it cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| SourceError::Unavailable {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&contents)
    }

    fn series(&self, contract: &ContractId) -> &[PriceObservation] {
        self.series.get(contract).map_or(&[], Vec::as_slice)
    }

    /// Hex SHA-256 of an instrument's listings and observations.
    fn content_hash(&self, instrument: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(instrument.as_bytes());
        if let Some(listings) = self.listings.get(instrument) {
            let mut sorted: Vec<&ContractListing> = listings.iter().collect();
            sorted.sort_by(|a, b| (&a.id, a.expiry).cmp(&(&b.id, b.expiry)));
            for listing in sorted {
                hasher.update(
                    format!(
                        "\n{}|{}|{}",
                        listing.id.key(),
                        optional_date(listing.expiry),
                        optional_date(listing.first_notice)
                    )
                    .as_bytes(),
                );
                for observation in self.series(&listing.id) {
                    hasher.update(
                        format!(
                            "\n{}|{}|{}",
                            observation.date,
                            observation.price.normalize(),
                            observation.volume.map_or_else(String::new, |v| v.to_string())
                        )
                        .as_bytes(),
                    );
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn optional_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(String::new, |date| date.to_string())
}

impl PricePanelSource for InMemoryPricePanel {
    fn instruments(&self) -> Vec<String> {
        self.listings.keys().cloned().collect()
    }

    fn list_contracts(&self, instrument: &str) -> Result<Vec<ContractListing>, SourceError> {
        self.listings
            .get(&instrument.to_uppercase())
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                instrument: instrument.to_string(),
            })
    }

    fn price_range(&self, contract: &ContractId) -> Option<(NaiveDate, NaiveDate)> {
        let series = self.series(contract);
        Some((series.first()?.date, series.last()?.date))
    }

    fn has_price(&self, contract: &ContractId, date: NaiveDate) -> bool {
        self.series(contract)
            .binary_search_by_key(&date, |o| o.date)
            .is_ok()
    }

    fn observations(&self, contract: &ContractId) -> Vec<PriceObservation> {
        self.series(contract).to_vec()
    }

    fn snapshot_version(&self, instrument: &str) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| self.content_hash(&instrument.to_uppercase()))
    }
}
