//! Data quality scoring for a stitched price series.

use serde::{Deserialize, Serialize};

/// Quality thresholds and sub-score weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Minimum observations for the series to be usable.
    #[serde(default = "default_min_price_observations")]
    pub min_price_observations: usize,
    /// Longest tolerated run of missing business days.
    #[serde(default = "default_max_price_gap_days")]
    pub max_price_gap_days: u32,
    /// Volume at or above which an observation counts as liquid.
    #[serde(default = "default_min_volume_for_liquidity")]
    pub min_volume_for_liquidity: u64,
    /// Largest tolerated fraction of missing business days.
    #[serde(default = "default_max_missing_data_percent")]
    pub max_missing_data_percent: f64,
    /// Minimum score as a fraction of 100.
    #[serde(default = "default_min_data_quality_score")]
    pub min_data_quality_score: f64,
    /// Sub-score weights.
    #[serde(default)]
    pub weights: QualityWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_price_observations: default_min_price_observations(),
            max_price_gap_days: default_max_price_gap_days(),
            min_volume_for_liquidity: default_min_volume_for_liquidity(),
            max_missing_data_percent: default_max_missing_data_percent(),
            min_data_quality_score: default_min_data_quality_score(),
            weights: QualityWeights::default(),
        }
    }
}

const fn default_min_price_observations() -> usize {
    20
}

const fn default_max_price_gap_days() -> u32 {
    5
}

const fn default_min_volume_for_liquidity() -> u64 {
    100
}

const fn default_max_missing_data_percent() -> f64 {
    0.1
}

const fn default_min_data_quality_score() -> f64 {
    0.7
}

/// Relative weights of the three sub-scores. Normalised by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight of coverage.
    pub coverage: f64,
    /// Weight of continuity.
    pub continuity: f64,
    /// Weight of volume sufficiency.
    pub volume: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            coverage: 0.4,
            continuity: 0.3,
            volume: 0.3,
        }
    }
}

impl QualityWeights {
    /// Sum of the weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.coverage + self.continuity + self.volume
    }
}

/// Raw counts describing a price series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Observations in the series.
    pub observations: usize,
    /// Business days between first and last observation, inclusive.
    pub expected_business_days: u32,
    /// Business days with an observation.
    pub observed_business_days: u32,
    /// Longest run of consecutive business days without an observation.
    pub longest_gap_days: u32,
    /// Observations carrying any volume.
    pub with_volume: usize,
    /// Observations with volume at or above the liquidity threshold.
    pub liquid_observations: usize,
}

/// Sub-scores, overall score and threshold flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Observed / expected business days.
    pub coverage: f64,
    /// One minus longest gap over span.
    pub continuity: f64,
    /// Fraction of liquid observations.
    pub volume: f64,
    /// Weighted score in `[0, 100]`.
    pub score: f64,
    /// Enough observations.
    pub meets_min_observations: bool,
    /// Longest gap within `max_price_gap_days`.
    pub gap_within_limit: bool,
    /// Missing fraction within `max_missing_data_percent`.
    pub missing_within_limit: bool,
    /// All flags set and score above the minimum.
    pub acceptable: bool,
}

impl QualityScore {
    /// Score that fails every check.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            coverage: 0.0,
            continuity: 0.0,
            volume: 0.0,
            score: 0.0,
            meets_min_observations: false,
            gap_within_limit: false,
            missing_within_limit: false,
            acceptable: false,
        }
    }

    /// Score a series.
    ///
    /// An empty series, or one where no observation carries volume, scores
    /// zero.
    #[must_use]
    pub fn compute(stats: &SeriesStats, config: &QualityConfig) -> Self {
        if stats.observations == 0 || stats.expected_business_days == 0 {
            return Self::zero();
        }

        let expected = f64::from(stats.expected_business_days);
        let coverage = (f64::from(stats.observed_business_days) / expected).clamp(0.0, 1.0);
        let continuity = (1.0 - f64::from(stats.longest_gap_days) / expected).clamp(0.0, 1.0);
        let volume = ratio(stats.liquid_observations, stats.observations);

        let weights = config.weights;
        let score = if stats.with_volume == 0 || weights.total() <= 0.0 {
            0.0
        } else {
            100.0
                * (weights.coverage * coverage
                    + weights.continuity * continuity
                    + weights.volume * volume)
                / weights.total()
        };

        let meets_min_observations = stats.observations >= config.min_price_observations;
        let gap_within_limit = stats.longest_gap_days <= config.max_price_gap_days;
        let missing_within_limit = 1.0 - coverage <= config.max_missing_data_percent;
        let acceptable = meets_min_observations
            && gap_within_limit
            && missing_within_limit
            && score >= config.min_data_quality_score * 100.0;

        Self {
            coverage,
            continuity,
            volume,
            score,
            meets_min_observations,
            gap_within_limit,
            missing_within_limit,
            acceptable,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(observed: u32, expected: u32, gap: u32) -> SeriesStats {
        SeriesStats {
            observations: observed as usize,
            expected_business_days: expected,
            observed_business_days: observed,
            longest_gap_days: gap,
            with_volume: observed as usize,
            liquid_observations: observed as usize,
        }
    }

    #[test]
    fn test_near_complete_series_scores_high() {
        let score = QualityScore::compute(&stats(250, 252, 1), &QualityConfig::default());
        assert!(score.score > 99.0, "score was {}", score.score);
        assert!(score.acceptable);
    }

    #[test]
    fn test_empty_series_scores_zero() {
        let score = QualityScore::compute(&SeriesStats::default(), &QualityConfig::default());
        assert_eq!(score, QualityScore::zero());
    }

    #[test]
    fn test_series_without_volume_scores_zero() {
        let mut no_volume = stats(250, 252, 1);
        no_volume.with_volume = 0;
        no_volume.liquid_observations = 0;
        let score = QualityScore::compute(&no_volume, &QualityConfig::default());
        assert!(score.score.abs() < f64::EPSILON);
        assert!(score.coverage > 0.99);
        assert!(!score.acceptable);
    }

    #[test]
    fn test_long_gap_fails_flag() {
        let score = QualityScore::compute(&stats(240, 252, 12), &QualityConfig::default());
        assert!(!score.gap_within_limit);
        assert!(score.missing_within_limit);
        assert!(!score.acceptable);
    }

    #[test]
    fn test_weights_are_normalised() {
        let config = QualityConfig {
            weights: QualityWeights {
                coverage: 4.0,
                continuity: 3.0,
                volume: 3.0,
            },
            ..QualityConfig::default()
        };
        let scaled = QualityScore::compute(&stats(200, 252, 3), &config);
        let default = QualityScore::compute(&stats(200, 252, 3), &QualityConfig::default());
        assert!((scaled.score - default.score).abs() < 1e-9);
    }

    #[test]
    fn test_few_observations() {
        let score = QualityScore::compute(&stats(10, 10, 0), &QualityConfig::default());
        assert!(!score.meets_min_observations);
        assert!(!score.acceptable);
    }
}
