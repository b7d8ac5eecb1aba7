//! Running extrema across rounds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{RoundStatistics, TertileBucket};

/// Scalar statistics tracked across rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    TotalWeight,
    HighWeightCount,
    LowWeightCount,
    AdversarialRatio,
    /// Heaviest eviction candidate, as a fraction of the serving total.
    LargestEvictionCandidate,
    EvictionCount,
}

impl Statistic {
    pub const ALL: [Statistic; 6] = [
        Statistic::TotalWeight,
        Statistic::HighWeightCount,
        Statistic::LowWeightCount,
        Statistic::AdversarialRatio,
        Statistic::LargestEvictionCandidate,
        Statistic::EvictionCount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::TotalWeight => "total_weight",
            Statistic::HighWeightCount => "high_weight_count",
            Statistic::LowWeightCount => "low_weight_count",
            Statistic::AdversarialRatio => "adversarial_ratio",
            Statistic::LargestEvictionCandidate => "largest_eviction_candidate",
            Statistic::EvictionCount => "eviction_count",
        }
    }
}

/// Observed `(min, max)` of one statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
}

impl Extrema {
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &Extrema) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Rounds whose adversarial ratio landed in each band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TertileCounts {
    pub over_third: u64,
    pub over_half: u64,
    pub over_two_thirds: u64,
}

impl TertileCounts {
    pub fn record(&mut self, bucket: TertileBucket) {
        match bucket {
            TertileBucket::OverThird => self.over_third += 1,
            TertileBucket::OverHalf => self.over_half += 1,
            TertileBucket::OverTwoThirds => self.over_two_thirds += 1,
        }
    }

    pub fn get(&self, bucket: TertileBucket) -> u64 {
        match bucket {
            TertileBucket::OverThird => self.over_third,
            TertileBucket::OverHalf => self.over_half,
            TertileBucket::OverTwoThirds => self.over_two_thirds,
        }
    }

    pub fn total(&self) -> u64 {
        self.over_third + self.over_half + self.over_two_thirds
    }

    pub fn merge(&mut self, other: &TertileCounts) {
        self.over_third += other.over_third;
        self.over_half += other.over_half;
        self.over_two_thirds += other.over_two_thirds;
    }
}

/// Final output of a run: extrema per statistic plus tertile counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub extrema: BTreeMap<Statistic, Extrema>,
    pub tertiles: TertileCounts,
    pub rounds: usize,
}

impl SimulationResult {
    pub fn get(&self, stat: Statistic) -> Option<Extrema> {
        self.extrema.get(&stat).copied()
    }

    /// Fold another result into this one (min of mins, max of maxes, summed counts).
    pub fn merge(&mut self, other: &SimulationResult) {
        for (stat, extrema) in &other.extrema {
            self.extrema
                .entry(*stat)
                .and_modify(|e| e.merge(extrema))
                .or_insert(*extrema);
        }
        self.tertiles.merge(&other.tertiles);
        self.rounds += other.rounds;
    }
}

/// Accumulates running min/max per statistic. O(1) per observation.
#[derive(Debug, Clone, Default)]
pub struct ResultReducer {
    extrema: BTreeMap<Statistic, Extrema>,
    tertiles: TertileCounts,
    rounds: usize,
}

impl ResultReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, stat: Statistic, value: f64) {
        self.extrema
            .entry(stat)
            .and_modify(|e| e.observe(value))
            .or_insert_with(|| Extrema::new(value));
    }

    /// Fold one round's measurements, including its tertile band.
    pub fn observe_round(&mut self, stats: &RoundStatistics) {
        self.observe(Statistic::TotalWeight, stats.total_weight);
        self.observe(Statistic::HighWeightCount, stats.high_weight_count as f64);
        self.observe(Statistic::LowWeightCount, stats.low_weight_count as f64);
        if let Some(ratio) = stats.adversarial_ratio {
            self.observe(Statistic::AdversarialRatio, ratio);
        }
        if let Some(bucket) = stats.tertile() {
            self.tertiles.record(bucket);
        }
        self.rounds += 1;
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn finalize(self) -> SimulationResult {
        SimulationResult {
            extrema: self.extrema,
            tertiles: self.tertiles,
            rounds: self.rounds,
        }
    }
}
