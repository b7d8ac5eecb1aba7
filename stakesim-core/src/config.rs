//! Immutable run parameters for the rotation engine.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::stats::Thresholds;
use crate::subset::SubsetPolicy;

/// How many serving members are evicted at the end of each round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Evict `floor(samples * rotation_percent / 100)` uniformly random members.
    FixedQuota,
    /// Evict members whose summed weight approaches
    /// `serving_total * rotation_percent / 100`, via greedy-shrinking selection.
    #[default]
    WeightBudget,
}

/// Adversarial set construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdversarialConfig {
    /// Target share of total population weight, in percent.
    pub percent: f64,
    #[serde(default)]
    pub policy: SubsetPolicy,
}

/// Parameters for one simulation run. Never mutated once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Target serving-set size.
    pub samples: usize,
    pub rounds: usize,
    /// Share rotated each round, in percent.
    pub rotation_percent: f64,
    #[serde(default)]
    pub rotation_policy: RotationPolicy,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub adversarial: Option<AdversarialConfig>,
    #[serde(default)]
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            samples: 200,
            rounds: 1000,
            rotation_percent: 10.0,
            rotation_policy: RotationPolicy::WeightBudget,
            thresholds: Thresholds::mainnet(),
            adversarial: Some(AdversarialConfig {
                percent: 5.0,
                policy: SubsetPolicy::bounded_retry(),
            }),
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.samples == 0 {
            return Err(SimError::invalid("samples must be positive"));
        }
        if self.rounds == 0 {
            return Err(SimError::invalid("rounds must be positive"));
        }
        if !(0.0..=100.0).contains(&self.rotation_percent) {
            return Err(SimError::invalid(format!(
                "rotation percent must be within [0, 100], got {}",
                self.rotation_percent
            )));
        }
        let Thresholds {
            high_fraction,
            low_fraction,
        } = self.thresholds;
        if !high_fraction.is_finite() || high_fraction < 0.0 {
            return Err(SimError::invalid(format!(
                "high fraction must be finite and nonnegative, got {high_fraction}"
            )));
        }
        if !low_fraction.is_finite() || low_fraction < 0.0 {
            return Err(SimError::invalid(format!(
                "low fraction must be finite and nonnegative, got {low_fraction}"
            )));
        }
        if low_fraction > high_fraction {
            return Err(SimError::invalid(format!(
                "low fraction ({low_fraction}) must not exceed high fraction ({high_fraction})"
            )));
        }
        if let Some(adversarial) = &self.adversarial {
            if !(0.0..=100.0).contains(&adversarial.percent) {
                return Err(SimError::invalid(format!(
                    "adversarial percent must be within [0, 100], got {}",
                    adversarial.percent
                )));
            }
            if let SubsetPolicy::BoundedRetryUniform {
                tolerance,
                retry_factor,
            } = adversarial.policy
            {
                if !tolerance.is_finite() || tolerance < 0.0 {
                    return Err(SimError::invalid(format!(
                        "selection tolerance must be finite and nonnegative, got {tolerance}"
                    )));
                }
                if retry_factor == 0 {
                    return Err(SimError::invalid("selection retry factor must be positive"));
                }
            }
        }
        Ok(())
    }

    /// Eviction count under [`RotationPolicy::FixedQuota`].
    pub fn fixed_quota(&self) -> usize {
        (self.samples as f64 * self.rotation_percent / 100.0).floor() as usize
    }
}
