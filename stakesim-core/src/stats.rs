//! Per-round statistics over the serving set.

use serde::{Deserialize, Serialize};

use crate::domain::{AdversarialSet, Population, ServingSet};

/// High/low weight cutoffs, as fractions of the full population weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// A member is high-weight if its weight exceeds `high_fraction * total`.
    pub high_fraction: f64,
    /// A member is low-weight if its weight is below `low_fraction * total`.
    pub low_fraction: f64,
}

impl Thresholds {
    /// 0.3% / 0.002%.
    pub fn mainnet() -> Self {
        Self {
            high_fraction: 0.003,
            low_fraction: 0.00002,
        }
    }

    /// 1% / 0.01%.
    pub fn coarse() -> Self {
        Self {
            high_fraction: 0.01,
            low_fraction: 0.0001,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Total weight plus high/low member counts for a list of weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSummary {
    pub total: f64,
    pub high_count: usize,
    pub low_count: usize,
}

/// Summarize `weights` against cutoffs derived from `population_total`.
pub fn summarize_weights<I>(weights: I, population_total: f64, thresholds: &Thresholds) -> WeightSummary
where
    I: IntoIterator<Item = f64>,
{
    let high_limit = population_total * thresholds.high_fraction;
    let low_limit = population_total * thresholds.low_fraction;
    let mut summary = WeightSummary {
        total: 0.0,
        high_count: 0,
        low_count: 0,
    };
    for w in weights {
        summary.total += w;
        if w > high_limit {
            summary.high_count += 1;
        } else if w < low_limit {
            summary.low_count += 1;
        }
    }
    summary
}

/// Adversarial-ratio band. Ratios at or below 1/3 fall in no band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TertileBucket {
    /// (1/3, 1/2]
    OverThird,
    /// (1/2, 2/3]
    OverHalf,
    /// (2/3, 1]
    OverTwoThirds,
}

impl TertileBucket {
    pub fn classify(ratio: f64) -> Option<Self> {
        if ratio > 2.0 / 3.0 {
            Some(TertileBucket::OverTwoThirds)
        } else if ratio > 0.5 {
            Some(TertileBucket::OverHalf)
        } else if ratio > 1.0 / 3.0 {
            Some(TertileBucket::OverThird)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TertileBucket::OverThird => "1/3 ~ 1/2",
            TertileBucket::OverHalf => "1/2 ~ 2/3",
            TertileBucket::OverTwoThirds => "> 2/3",
        }
    }
}

/// Measurements of one round's serving set. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundStatistics {
    pub total_weight: f64,
    pub high_weight_count: usize,
    pub low_weight_count: usize,
    /// Share of serving weight held by adversarial members, when an
    /// adversarial set is configured.
    pub adversarial_ratio: Option<f64>,
}

impl RoundStatistics {
    pub fn tertile(&self) -> Option<TertileBucket> {
        self.adversarial_ratio.and_then(TertileBucket::classify)
    }
}

/// Measure the serving set against the full population.
pub fn measure(
    population: &Population,
    serving: &ServingSet,
    adversarial: Option<&AdversarialSet>,
    thresholds: &Thresholds,
) -> RoundStatistics {
    let summary = summarize_weights(serving.weights(population), population.total(), thresholds);
    let adversarial_ratio = adversarial.map(|set| {
        let held: f64 = serving
            .members()
            .iter()
            .filter(|&&i| set.contains(i))
            .map(|&i| population.weight(i))
            .sum();
        if summary.total > 0.0 {
            held / summary.total
        } else {
            0.0
        }
    });
    RoundStatistics {
        total_weight: summary.total,
        high_weight_count: summary.high_count,
        low_weight_count: summary.low_count,
        adversarial_ratio,
    }
}
