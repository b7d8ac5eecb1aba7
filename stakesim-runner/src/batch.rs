//! Independent trials of the same simulation.
//!
//! Each trial is a full, separate rotation engine with its own seed. A single
//! trial uses the configured seed as-is; with several trials, each seed is
//! derived from the configured one through the BLAKE3 seed hierarchy, so the
//! batch is reproducible and independent of thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stakesim_core::rng::TRIAL_STREAM;
use stakesim_core::{
    simulate, Population, RngHierarchy, SimConfig, SimError, SimulationOutcome, SimulationResult,
};
use thiserror::Error;
use tracing::info;

use crate::config::BatchConfig;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("trial {trial} (seed {seed}) failed: {source}")]
    TrialFailed {
        trial: usize,
        seed: u64,
        #[source]
        source: SimError,
    },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    #[error("batch needs at least one trial")]
    NoTrials,
}

/// One trial's seed and outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial: usize,
    pub seed: u64,
    pub outcome: SimulationOutcome,
}

/// All trials plus their merged extrema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub trials: Vec<TrialResult>,
    /// Min of mins, max of maxes and summed tertile counts across trials.
    pub combined: SimulationResult,
}

impl BatchResult {
    /// True when every trial's adversarial selection reached its target.
    pub fn adversarial_complete(&self) -> bool {
        self.trials.iter().all(|t| {
            t.outcome
                .adversarial
                .as_ref()
                .map_or(true, |summary| summary.complete)
        })
    }
}

/// Seed used for `trial` out of `trials`.
pub fn trial_seed(base_seed: u64, trial: usize, trials: usize) -> u64 {
    if trials == 1 {
        base_seed
    } else {
        RngHierarchy::new(base_seed).sub_seed(TRIAL_STREAM, trial as u64)
    }
}

pub fn run_batch(
    population: &Population,
    sim: &SimConfig,
    batch: &BatchConfig,
) -> Result<BatchResult, BatchError> {
    if batch.trials == 0 {
        return Err(BatchError::NoTrials);
    }
    info!(trials = batch.trials, threads = ?batch.threads, "running batch");

    let run_trial = |trial: usize| -> Result<TrialResult, BatchError> {
        let seed = trial_seed(sim.seed, trial, batch.trials);
        let config = SimConfig {
            seed,
            ..sim.clone()
        };
        let outcome = simulate(population, &config)
            .map_err(|source| BatchError::TrialFailed { trial, seed, source })?;
        Ok(TrialResult {
            trial,
            seed,
            outcome,
        })
    };

    let trials: Vec<TrialResult> = match batch.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                (0..batch.trials)
                    .into_par_iter()
                    .map(run_trial)
                    .collect::<Result<_, _>>()
            })?
        }
        None => (0..batch.trials)
            .into_par_iter()
            .map(run_trial)
            .collect::<Result<_, _>>()?,
    };

    let mut combined = SimulationResult::default();
    for trial in &trials {
        combined.merge(&trial.outcome.result);
    }
    Ok(BatchResult { trials, combined })
}
