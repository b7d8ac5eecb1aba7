//! Bounded subset selection: pick members whose summed weight approaches a
//! budget from below.
//!
//! Two policies:
//! - [`SubsetPolicy::GreedyShrinking`] draws uniformly from a weight-sorted
//!   candidate list that is pruned from the heavy end as the remaining budget
//!   shrinks. Terminates within `candidates.len()` draws.
//! - [`SubsetPolicy::BoundedRetryUniform`] draws uniformly from the whole
//!   population, skipping repeats and overshoots, up to a fixed retry ceiling.
//!   Used to seed the adversarial set.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Population;

/// Default overshoot tolerance for bounded-retry selection.
pub const DEFAULT_TOLERANCE: f64 = 0.0001;

/// Default retry ceiling, as a multiple of population size.
pub const DEFAULT_RETRY_FACTOR: usize = 10_000;

/// Which selection strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubsetPolicy {
    GreedyShrinking,
    BoundedRetryUniform {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_retry_factor")]
        retry_factor: usize,
    },
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_retry_factor() -> usize {
    DEFAULT_RETRY_FACTOR
}

impl SubsetPolicy {
    pub fn bounded_retry() -> Self {
        SubsetPolicy::BoundedRetryUniform {
            tolerance: DEFAULT_TOLERANCE,
            retry_factor: DEFAULT_RETRY_FACTOR,
        }
    }

    /// Run this policy over the whole population.
    pub fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        budget: f64,
        rng: &mut R,
    ) -> SubsetSelection {
        match *self {
            SubsetPolicy::GreedyShrinking => {
                let all: Vec<usize> = (0..population.len()).collect();
                select_greedy_shrinking(population, &all, budget, rng)
            }
            SubsetPolicy::BoundedRetryUniform {
                tolerance,
                retry_factor,
            } => select_bounded_retry(population, budget, tolerance, retry_factor, rng),
        }
    }
}

impl Default for SubsetPolicy {
    fn default() -> Self {
        Self::bounded_retry()
    }
}

/// Outcome of a bounded subset selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetSelection {
    /// Selected member indices, in acceptance order.
    pub indices: Vec<usize>,
    /// Summed weight of `indices`.
    pub achieved: f64,
    /// The weight budget that was requested.
    pub target: f64,
    /// Heaviest weight in the initial candidate list (greedy policy only;
    /// zero for bounded-retry).
    pub largest_candidate: f64,
    /// False when bounded-retry ran out of attempts before reaching the target.
    pub complete: bool,
}

impl SubsetSelection {
    fn empty(target: f64) -> Self {
        Self {
            indices: Vec::new(),
            achieved: 0.0,
            target,
            largest_candidate: 0.0,
            complete: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Weight still missing from the target; zero once reached.
    pub fn shortfall(&self) -> f64 {
        (self.target - self.achieved).max(0.0)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Greedy-shrinking selection restricted to `candidates`.
///
/// Candidates are sorted by weight (ties by index). Before each draw, any
/// candidate heavier than the remaining budget is pruned from the tail; a
/// uniformly random survivor is then accepted. Stops when the sum reaches the
/// budget, when even the lightest survivor would overshoot, or when no
/// candidates remain.
pub fn select_greedy_shrinking<R: Rng + ?Sized>(
    population: &Population,
    candidates: &[usize],
    budget: f64,
    rng: &mut R,
) -> SubsetSelection {
    let mut pool = candidates.to_vec();
    pool.sort_by(|a, b| {
        population
            .weight(*a)
            .total_cmp(&population.weight(*b))
            .then_with(|| a.cmp(b))
    });

    let (Some(&lightest), Some(&heaviest)) = (pool.first(), pool.last()) else {
        return SubsetSelection::empty(budget);
    };
    let mut selection = SubsetSelection::empty(budget);
    selection.largest_candidate = population.weight(heaviest);
    let mut smallest = population.weight(lightest);

    for _ in 0..candidates.len() {
        while pool
            .last()
            .is_some_and(|&i| population.weight(i) > budget - selection.achieved)
        {
            pool.pop();
        }
        if pool.is_empty() {
            break;
        }

        let pos = rng.gen_range(0..pool.len());
        let index = pool.remove(pos);
        selection.achieved += population.weight(index);
        selection.indices.push(index);

        if pos == 0 {
            if let Some(&next) = pool.first() {
                smallest = population.weight(next);
            }
        }
        if selection.achieved >= budget || selection.achieved + smallest > budget {
            break;
        }
    }

    selection
}

/// Bounded-retry uniform selection over the whole population.
///
/// Draws uniformly random members, skipping those already selected or whose
/// weight would push the sum past `budget * (1 + tolerance)`. Gives up after
/// `retry_factor * population.len()` draws and returns whatever was
/// accumulated, flagged incomplete.
pub fn select_bounded_retry<R: Rng + ?Sized>(
    population: &Population,
    budget: f64,
    tolerance: f64,
    retry_factor: usize,
    rng: &mut R,
) -> SubsetSelection {
    let mut selection = SubsetSelection::empty(budget);
    if budget <= 0.0 || population.is_empty() {
        return selection;
    }

    let ceiling = budget * (1.0 + tolerance);
    let max_attempts = retry_factor.saturating_mul(population.len());
    let mut taken = vec![false; population.len()];

    for _ in 0..max_attempts {
        let index = rng.gen_range(0..population.len());
        if taken[index] {
            continue;
        }
        let w = population.weight(index);
        if selection.achieved + w > ceiling {
            continue;
        }
        taken[index] = true;
        selection.achieved += w;
        selection.indices.push(index);
        if selection.achieved >= budget {
            return selection;
        }
    }

    selection.complete = selection.achieved >= budget;
    selection
}
