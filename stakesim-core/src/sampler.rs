//! Weighted sampling without replacement.
//!
//! Each candidate with weight `w > 0` gets the key `-ln(u) / w` for
//! `u ~ U(0, 1)`, and the `k` smallest keys win. Keys are exponential with
//! rate `w`, so the smallest key falls on candidate `i` with probability
//! `w_i / sum(w)`, and by memorylessness the next smallest is distributed the
//! same way over the remaining candidates. Sorting winners by key therefore
//! reproduces the successive-conditional draw order in O(n log k).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::distributions::Open01;
use rand::Rng;

use crate::error::{SimError, SimResult};

/// Draw `k` distinct entries of `pool`, proportional to the parallel `weights`.
///
/// The result is in draw order. Candidates with zero weight are never drawn.
pub fn weighted_sample<R: Rng + ?Sized>(
    pool: &[usize],
    weights: &[f64],
    k: usize,
    rng: &mut R,
) -> SimResult<Vec<usize>> {
    if pool.len() != weights.len() {
        return Err(SimError::invalid(format!(
            "pool has {} entries but {} weights were given",
            pool.len(),
            weights.len()
        )));
    }
    if k > pool.len() {
        return Err(SimError::invalid(format!(
            "cannot draw {k} members from a pool of {}",
            pool.len()
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SimError::invalid("sampling weights must be finite and nonnegative"));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SimError::invalid("sampling weights sum to zero"));
    }
    let positive = weights.iter().filter(|w| **w > 0.0).count();
    if k > positive {
        return Err(SimError::invalid(format!(
            "cannot draw {k} members when only {positive} have nonzero weight"
        )));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    // Max-heap on key: the root is the weakest of the current k winners.
    let mut heap: BinaryHeap<Keyed> = BinaryHeap::with_capacity(k + 1);
    for (slot, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        let u: f64 = rng.sample(Open01);
        let key = -u.ln() / w;
        if heap.len() < k {
            heap.push(Keyed { key, slot });
        } else if heap.peek().is_some_and(|top| key < top.key) {
            heap.pop();
            heap.push(Keyed { key, slot });
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|keyed| pool[keyed.slot])
        .collect())
}

#[derive(Debug, Clone, Copy)]
struct Keyed {
    key: f64,
    slot: usize,
}

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Keyed {}

impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}
