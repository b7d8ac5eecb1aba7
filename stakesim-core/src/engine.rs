//! Rotation engine: the per-round refill / measure / evict loop.
//!
//! Round `r`:
//! 1. **Refill**: cooling members flip back to idle (but sit out this
//!    round), then `select_count` idle members are admitted by weighted
//!    sampling. `select_count` is `samples` on round 0 and the previous
//!    round's eviction count afterwards.
//! 2. **Measure**: statistics of the serving set.
//! 3. **Evict**: by fixed quota or by weight budget; evicted members start
//!    cooling.
//!
//! The engine exclusively owns member state and the serving set. The
//! population and adversarial set are borrowed read-only.

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{RotationPolicy, SimConfig};
use crate::domain::{AdversarialSet, MemberState, Population, ServingSet};
use crate::error::{SimError, SimResult};
use crate::reducer::{ResultReducer, SimulationResult, Statistic};
use crate::rng::{RngHierarchy, ADVERSARIAL_STREAM, ROTATION_STREAM};
use crate::sampler::weighted_sample;
use crate::stats::{measure, RoundStatistics};
use crate::subset::select_greedy_shrinking;

/// Rounds between progress log lines.
const PROGRESS_INTERVAL: usize = 1000;

/// Eviction overshoot above which a diagnostic is logged.
const OVERSHOOT_TOLERANCE: f64 = 1.01;

/// Everything that happened in one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: usize,
    pub admitted: usize,
    pub stats: RoundStatistics,
    pub evicted: usize,
    /// Heaviest eviction candidate as a fraction of the serving total.
    pub largest_candidate: f64,
    /// Serving size after eviction.
    pub serving_after: usize,
}

struct Eviction {
    evicted: Vec<usize>,
    largest_candidate: f64,
}

pub struct RotationEngine<'a> {
    population: &'a Population,
    adversarial: Option<&'a AdversarialSet>,
    config: SimConfig,
    states: Vec<MemberState>,
    serving: ServingSet,
    rng: StdRng,
    round: usize,
    pending_admissions: usize,
}

impl<'a> RotationEngine<'a> {
    /// Build an engine; the round loop draws from the config seed's rotation stream.
    pub fn new(
        population: &'a Population,
        adversarial: Option<&'a AdversarialSet>,
        config: SimConfig,
    ) -> SimResult<Self> {
        let rng = RngHierarchy::new(config.seed).rng_for(ROTATION_STREAM, 0);
        Self::with_rng(population, adversarial, config, rng)
    }

    pub fn with_rng(
        population: &'a Population,
        adversarial: Option<&'a AdversarialSet>,
        config: SimConfig,
        rng: StdRng,
    ) -> SimResult<Self> {
        config.validate()?;
        if config.samples > population.len() {
            return Err(SimError::invalid(format!(
                "samples ({}) exceeds population size ({})",
                config.samples,
                population.len()
            )));
        }
        if let Some(set) = adversarial {
            if set.population_size() != population.len() {
                return Err(SimError::invalid(format!(
                    "adversarial set covers {} members but population has {}",
                    set.population_size(),
                    population.len()
                )));
            }
        }
        Ok(Self {
            population,
            adversarial,
            states: vec![MemberState::Idle; population.len()],
            serving: ServingSet::new(population.len()),
            pending_admissions: config.samples,
            config,
            rng,
            round: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn is_finished(&self) -> bool {
        self.round >= self.config.rounds
    }

    /// State of `member`, or `None` if it is outside the population.
    pub fn state(&self, member: usize) -> Option<MemberState> {
        self.states.get(member).copied()
    }

    pub fn serving(&self) -> &ServingSet {
        &self.serving
    }

    /// Run one refill / measure / evict cycle.
    pub fn step(&mut self) -> SimResult<RoundReport> {
        if self.is_finished() {
            return Err(SimError::invalid(format!(
                "all {} rounds already ran",
                self.config.rounds
            )));
        }
        let round = self.round;
        if round % PROGRESS_INTERVAL == 0 {
            debug!(round, serving = self.serving.len(), "rotation round");
        }

        let select_count = self.pending_admissions;
        let admitted = self.refill(round, select_count)?;
        let stats = measure(
            self.population,
            &self.serving,
            self.adversarial,
            &self.config.thresholds,
        );
        let eviction = self.evict(stats.total_weight);

        for &member in &eviction.evicted {
            self.states[member] = MemberState::Cooling;
            self.serving.remove(member);
        }
        self.pending_admissions = eviction.evicted.len();
        self.round += 1;

        Ok(RoundReport {
            round,
            admitted,
            stats,
            evicted: eviction.evicted.len(),
            largest_candidate: eviction.largest_candidate,
            serving_after: self.serving.len(),
        })
    }

    /// Run every remaining round and fold them into a result.
    pub fn run(mut self) -> SimResult<SimulationResult> {
        let mut reducer = ResultReducer::new();
        while !self.is_finished() {
            let report = self.step()?;
            reducer.observe_round(&report.stats);
            reducer.observe(Statistic::LargestEvictionCandidate, report.largest_candidate);
            reducer.observe(Statistic::EvictionCount, report.evicted as f64);
        }
        Ok(reducer.finalize())
    }

    fn refill(&mut self, round: usize, count: usize) -> SimResult<usize> {
        let mut pool = Vec::new();
        let mut weights = Vec::new();
        for (member, state) in self.states.iter_mut().enumerate() {
            match state {
                MemberState::Idle => {
                    pool.push(member);
                    weights.push(self.population.weight(member));
                }
                MemberState::Cooling => *state = MemberState::Idle,
                MemberState::Serving => {}
            }
        }
        if count == 0 {
            return Ok(0);
        }

        if pool.len() < count {
            return Err(SimError::InsufficientPool {
                round,
                requested: count,
                available: pool.len(),
            });
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(SimError::DegeneratePopulation { round });
        }
        let drawable = weights.iter().filter(|w| **w > 0.0).count();
        if drawable < count {
            return Err(SimError::InsufficientPool {
                round,
                requested: count,
                available: drawable,
            });
        }

        let admitted = weighted_sample(&pool, &weights, count, &mut self.rng)?;
        for &member in &admitted {
            self.states[member] = MemberState::Serving;
            self.serving.insert(member);
        }
        Ok(admitted.len())
    }

    fn evict(&mut self, serving_total: f64) -> Eviction {
        let share = |w: f64| if serving_total > 0.0 { w / serving_total } else { 0.0 };
        match self.config.rotation_policy {
            RotationPolicy::FixedQuota => {
                let members = self.serving.members();
                let quota = self.config.fixed_quota().min(members.len());
                let evicted: Vec<usize> = index::sample(&mut self.rng, members.len(), quota)
                    .into_iter()
                    .map(|pos| members[pos])
                    .collect();
                let heaviest = members
                    .iter()
                    .map(|&m| self.population.weight(m))
                    .fold(0.0, f64::max);
                Eviction {
                    evicted,
                    largest_candidate: share(heaviest),
                }
            }
            RotationPolicy::WeightBudget => {
                let target = serving_total * self.config.rotation_percent / 100.0;
                let selection = select_greedy_shrinking(
                    self.population,
                    self.serving.members(),
                    target,
                    &mut self.rng,
                );
                if selection.achieved > target * OVERSHOOT_TOLERANCE {
                    warn!(
                        round = self.round,
                        removed = selection.achieved,
                        target,
                        "eviction overshot its weight target"
                    );
                }
                Eviction {
                    largest_candidate: share(selection.largest_candidate),
                    evicted: selection.indices,
                }
            }
        }
    }
}

/// How the adversarial set came out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdversarialSummary {
    pub members: usize,
    pub target_weight: f64,
    pub achieved_weight: f64,
    pub complete: bool,
}

/// Result of [`simulate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub result: SimulationResult,
    pub adversarial: Option<AdversarialSummary>,
}

/// Select the adversarial set described by `config`, if any.
///
/// A selection that stops short of its target is kept and logged, not
/// rejected.
pub fn build_adversarial_set(
    population: &Population,
    config: &SimConfig,
) -> SimResult<Option<(AdversarialSet, AdversarialSummary)>> {
    let Some(adversarial) = &config.adversarial else {
        return Ok(None);
    };
    let mut rng = RngHierarchy::new(config.seed).rng_for(ADVERSARIAL_STREAM, 0);
    let target = population.total() * adversarial.percent / 100.0;
    let selection = adversarial.policy.select(population, target, &mut rng);
    if !selection.is_complete() {
        warn!(
            target,
            achieved = selection.achieved,
            shortfall = selection.shortfall(),
            "adversarial selection exhausted its retries; continuing with a partial set"
        );
    }
    let set = AdversarialSet::from_indices(population.len(), &selection.indices)?;
    let summary = AdversarialSummary {
        members: set.len(),
        target_weight: target,
        achieved_weight: selection.achieved,
        complete: selection.is_complete(),
    };
    Ok(Some((set, summary)))
}

/// Build the adversarial set and run every round of one simulation.
pub fn simulate(population: &Population, config: &SimConfig) -> SimResult<SimulationOutcome> {
    config.validate()?;
    info!(
        members = population.len(),
        samples = config.samples,
        rounds = config.rounds,
        rotation_percent = config.rotation_percent,
        policy = ?config.rotation_policy,
        seed = config.seed,
        "starting simulation"
    );
    let adversarial = build_adversarial_set(population, config)?;
    let (set, summary) = match adversarial {
        Some((set, summary)) => (Some(set), Some(summary)),
        None => (None, None),
    };
    let engine = RotationEngine::new(population, set.as_ref(), config.clone())?;
    let result = engine.run()?;
    info!(rounds = result.rounds, "simulation finished");
    Ok(SimulationOutcome {
        result,
        adversarial: summary,
    })
}
