//! Population ingestion and resizing.
//!
//! Weights come from a plain text file, one nonnegative number per line
//! (blank lines are skipped). [`interpolate`] can then upsample the list to a
//! target member count.
//!
//! Interpolation is a deliberate approximation, not a statistically rigorous
//! resampling: new members are placed by linear interpolation along the
//! sorted weight curve and the combined list is re-sorted, so the shape of the
//! weight distribution changes along with its cardinality.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stakesim_core::{summarize_weights, Population, SimError, Thresholds};
use thiserror::Error;

/// Errors from reading a population file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read population file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: '{value}' is not a number")]
    Parse { line: usize, value: String },

    #[error("line {line}: weight {value} must be finite and nonnegative")]
    InvalidWeight { line: usize, value: f64 },

    #[error("population file {path} contains no weights")]
    Empty { path: PathBuf },

    #[error("invalid population: {0}")]
    Invalid(#[from] SimError),
}

/// Parse one weight per line. Line numbers in errors are 1-based.
pub fn parse_weights(text: &str) -> Result<Vec<f64>, LoadError> {
    let mut weights = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: f64 = trimmed.parse().map_err(|_| LoadError::Parse {
            line: i + 1,
            value: trimmed.to_string(),
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(LoadError::InvalidWeight { line: i + 1, value });
        }
        weights.push(value);
    }
    Ok(weights)
}

/// Read a weight file from disk.
pub fn read_weights(path: &Path) -> Result<Vec<f64>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let weights = parse_weights(&text)?;
    if weights.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(weights)
}

/// Upsample `weights` to `target` members.
///
/// Returns the input unchanged when it already has at least `target` members
/// (or is empty). Otherwise returns exactly `target` weights sorted
/// ascending: the originals plus `target - len` points spaced evenly along
/// the sorted curve.
pub fn interpolate(weights: &[f64], target: usize) -> Vec<f64> {
    let n = weights.len();
    if n >= target || n == 0 {
        return weights.to_vec();
    }

    let mut curve = weights.to_vec();
    curve.sort_by(f64::total_cmp);

    let extra = target - n;
    let span = (n - 1) as f64;
    let step = if extra > 1 { span / (extra - 1) as f64 } else { 0.0 };

    let mut out = curve.clone();
    out.reserve(extra);
    for j in 0..extra {
        let x = (j as f64 * step).min(span);
        let lo = x.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = x - lo as f64;
        out.push(curve[lo] + (curve[hi] - curve[lo]) * frac);
    }
    out.sort_by(f64::total_cmp);
    out
}

/// Read a population file and optionally interpolate it up to `interpolate_to` members.
pub fn load_population(path: &Path, interpolate_to: Option<usize>) -> Result<Population, LoadError> {
    let mut weights = read_weights(path)?;
    if let Some(target) = interpolate_to {
        let before = weights.len();
        weights = interpolate(&weights, target);
        if weights.len() != before {
            tracing::info!(from = before, to = weights.len(), "interpolated population");
        }
    }
    Ok(Population::new(weights)?)
}

/// Whole-population totals reported before a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub members: usize,
    pub total_weight: f64,
    pub high_weight_count: usize,
    pub low_weight_count: usize,
    pub thresholds: Thresholds,
}

pub fn summarize_population(population: &Population, thresholds: &Thresholds) -> PopulationSummary {
    let summary = summarize_weights(
        population.weights().iter().copied(),
        population.total(),
        thresholds,
    );
    PopulationSummary {
        members: population.len(),
        total_weight: summary.total,
        high_weight_count: summary.high_count,
        low_weight_count: summary.low_count,
        thresholds: *thresholds,
    }
}
