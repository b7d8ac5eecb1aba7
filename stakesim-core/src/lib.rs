//! StakeSim Core: rotation simulation over a weighted population.
//!
//! This crate contains the simulation engine:
//! - Weighted sampling without replacement (exponential-key method)
//! - Bounded subset selection (greedy-shrinking and bounded-retry policies)
//! - Per-round statistics and adversarial tertile classification
//! - Rotation engine with idle / serving / cooling member states
//! - Running min/max reduction across rounds
//! - Deterministic seed hierarchy
//!
//! File ingestion, interpolation and reporting live in `stakesim-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod reducer;
pub mod rng;
pub mod sampler;
pub mod stats;
pub mod subset;

pub use config::{AdversarialConfig, RotationPolicy, SimConfig};
pub use domain::{AdversarialSet, MemberState, Population, ServingSet};
pub use engine::{
    build_adversarial_set, simulate, AdversarialSummary, RotationEngine, RoundReport,
    SimulationOutcome,
};
pub use error::{SimError, SimResult};
pub use reducer::{Extrema, ResultReducer, SimulationResult, Statistic, TertileCounts};
pub use rng::RngHierarchy;
pub use sampler::weighted_sample;
pub use stats::{measure, summarize_weights, RoundStatistics, TertileBucket, Thresholds, WeightSummary};
pub use subset::{select_bounded_retry, select_greedy_shrinking, SubsetPolicy, SubsetSelection};
