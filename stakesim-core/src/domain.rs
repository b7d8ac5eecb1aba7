//! Domain types: the weighted population, per-member status, the serving set
//! and the adversarial set.
//!
//! A member's identity is its index into the population's weight vector. The
//! weight vector and the adversarial set are fixed for a run and shared
//! read-only; membership state is owned by the rotation engine.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Ordered, immutable list of nonnegative member weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    weights: Vec<f64>,
    total: f64,
}

impl Population {
    /// Build a population, rejecting empty input and negative or non-finite weights.
    pub fn new(weights: Vec<f64>) -> SimResult<Self> {
        if weights.is_empty() {
            return Err(SimError::invalid("population must contain at least one member"));
        }
        if let Some((index, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(SimError::invalid(format!(
                "weight of member {index} must be finite and nonnegative, got {w}"
            )));
        }
        let total = weights.iter().sum();
        Ok(Self { weights, total })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weight(&self, index: usize) -> f64 {
        self.weights[index]
    }

    /// Sum of all member weights.
    pub fn total(&self) -> f64 {
        self.total
    }
}

/// Lifecycle status of a single member.
///
/// Transitions: `Idle -> Serving` (admission), `Serving -> Cooling`
/// (eviction), `Cooling -> Idle` (cooldown expiry during the next refill).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    Idle,
    Serving,
    Cooling,
}

/// Members currently counted in the active subset.
///
/// Backed by a dense member list plus an index-to-position table, so both
/// insertion and removal are O(1) and iteration order depends only on the
/// sequence of operations (never on hashing).
#[derive(Debug, Clone)]
pub struct ServingSet {
    members: Vec<usize>,
    positions: Vec<Option<usize>>,
}

impl ServingSet {
    /// Empty serving set over a population of `population_size` members.
    pub fn new(population_size: usize) -> Self {
        Self {
            members: Vec::new(),
            positions: vec![None; population_size],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.positions.get(index).is_some_and(|p| p.is_some())
    }

    /// Returns false if the member was already serving.
    pub fn insert(&mut self, index: usize) -> bool {
        if self.contains(index) {
            return false;
        }
        self.positions[index] = Some(self.members.len());
        self.members.push(index);
        true
    }

    /// Returns false if the member was not serving.
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(pos) = self.positions.get_mut(index).and_then(Option::take) else {
            return false;
        };
        self.members.swap_remove(pos);
        if let Some(&moved) = self.members.get(pos) {
            self.positions[moved] = Some(pos);
        }
        true
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Weights of the serving members, in serving order.
    pub fn weights<'a>(&'a self, population: &'a Population) -> impl Iterator<Item = f64> + 'a {
        self.members.iter().map(move |&i| population.weight(i))
    }
}

/// Fixed set of members designated non-conforming for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdversarialSet {
    mask: Vec<bool>,
    count: usize,
}

impl AdversarialSet {
    /// Build from member indices; duplicates are ignored.
    pub fn from_indices(population_size: usize, indices: &[usize]) -> SimResult<Self> {
        let mut mask = vec![false; population_size];
        let mut count = 0;
        for &i in indices {
            let slot = mask.get_mut(i).ok_or_else(|| {
                SimError::invalid(format!(
                    "adversarial member {i} is outside a population of {population_size}"
                ))
            })?;
            if !*slot {
                *slot = true;
                count += 1;
            }
        }
        Ok(Self { mask, count })
    }

    pub fn contains(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    /// Size of the population this set was built over.
    pub fn population_size(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Combined weight of the set within `population`.
    pub fn weight(&self, population: &Population) -> f64 {
        self.mask
            .iter()
            .zip(population.weights())
            .filter(|(member, _)| **member)
            .map(|(_, w)| w)
            .sum()
    }
}
