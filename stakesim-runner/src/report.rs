//! Human-readable console report.
//!
//! Weight totals print as a percentage of the population weight, ratios as
//! percentages, counts as plain integers.

use std::fmt::Write;

use stakesim_core::{
    AdversarialSummary, Extrema, SimConfig, SimulationResult, Statistic, TertileBucket, Thresholds,
};

use crate::batch::BatchResult;
use crate::population::PopulationSummary;

fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Threshold as a compact percentage: 0.003 -> "0.3", 0.00002 -> "0.002".
fn threshold_percent(fraction: f64) -> String {
    let text = format!("{:.4}", percent(fraction));
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn count_range(extrema: Option<Extrema>) -> String {
    match extrema {
        Some(e) => format!("{} to {}", e.min as u64, e.max as u64),
        None => "n/a".into(),
    }
}

fn percent_range(extrema: Option<Extrema>, scale: f64) -> String {
    match extrema {
        Some(e) if scale > 0.0 => format!(
            "{:.2}% to {:.2}%",
            percent(e.min / scale),
            percent(e.max / scale)
        ),
        _ => "n/a".into(),
    }
}

pub fn format_population(summary: &PopulationSummary) -> String {
    format!(
        "total weight {} across {} members, high (>{}%) {}, low (<{}%) {}",
        summary.total_weight,
        summary.members,
        threshold_percent(summary.thresholds.high_fraction),
        summary.high_weight_count,
        threshold_percent(summary.thresholds.low_fraction),
        summary.low_weight_count,
    )
}

pub fn format_run_header(config: &SimConfig, members: usize, trials: usize) -> String {
    format!(
        "random sampling {} out of {members}, {} rounds rotating {}% every round ({:?}), {trials} trial(s), seed {}",
        config.samples, config.rounds, config.rotation_percent, config.rotation_policy, config.seed,
    )
}

pub fn format_adversarial(summary: &AdversarialSummary, population_total: f64) -> String {
    let share = if population_total > 0.0 {
        percent(summary.achieved_weight / population_total)
    } else {
        0.0
    };
    let mut line = format!(
        "adversarial set: {} members holding {share:.2}% of weight",
        summary.members
    );
    if !summary.complete {
        let _ = write!(
            line,
            " (best effort: target {:.4} not reached, short by {:.4})",
            summary.target_weight,
            summary.target_weight - summary.achieved_weight
        );
    }
    line
}

/// Multi-line report of a run's extrema.
pub fn format_result(
    result: &SimulationResult,
    thresholds: &Thresholds,
    population_total: f64,
) -> String {
    let (high, low) = (thresholds.high_fraction, thresholds.low_fraction);
    let mut out = String::new();
    let _ = writeln!(out, "=== Rotation Result ({} rounds) ===", result.rounds);
    let _ = writeln!(
        out,
        "Total weight:        {}",
        percent_range(result.get(Statistic::TotalWeight), population_total)
    );
    let _ = writeln!(
        out,
        "High (>{}%):        {}",
        threshold_percent(high),
        count_range(result.get(Statistic::HighWeightCount))
    );
    let _ = writeln!(
        out,
        "Low (<{}%):      {}",
        threshold_percent(low),
        count_range(result.get(Statistic::LowWeightCount))
    );
    if let Some(ratio) = result.get(Statistic::AdversarialRatio) {
        let _ = writeln!(
            out,
            "Adversarial ratio:   {:.2}% to {:.2}%",
            percent(ratio.min),
            percent(ratio.max)
        );
        for bucket in [
            TertileBucket::OverThird,
            TertileBucket::OverHalf,
            TertileBucket::OverTwoThirds,
        ] {
            let _ = writeln!(
                out,
                "  rounds ({}):   {}",
                bucket.label(),
                result.tertiles.get(bucket)
            );
        }
    }
    let _ = writeln!(
        out,
        "Largest candidate:   {}",
        percent_range(result.get(Statistic::LargestEvictionCandidate), 1.0)
    );
    let _ = write!(
        out,
        "Evicted per round:   {}",
        count_range(result.get(Statistic::EvictionCount))
    );
    out
}

/// Report for a batch: the combined extrema, then one line per trial.
pub fn format_batch(batch: &BatchResult, config: &SimConfig, population_total: f64) -> String {
    let mut out = format_result(&batch.combined, &config.thresholds, population_total);
    if batch.trials.len() > 1 {
        let _ = write!(out, "\n\n--- Trials ---");
        for trial in &batch.trials {
            let _ = write!(
                out,
                "\ntrial {:>3} seed {:>20}  total {}",
                trial.trial,
                trial.seed,
                percent_range(trial.outcome.result.get(Statistic::TotalWeight), population_total)
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakesim_core::ResultReducer;

    #[test]
    fn result_report_formats_percentages_and_counts() {
        let mut reducer = ResultReducer::new();
        reducer.observe(Statistic::TotalWeight, 25.0);
        reducer.observe(Statistic::TotalWeight, 50.0);
        reducer.observe(Statistic::HighWeightCount, 3.0);
        reducer.observe(Statistic::EvictionCount, 4.0);
        let text = format_result(&reducer.finalize(), &Thresholds::mainnet(), 100.0);

        assert!(text.contains("25.00% to 50.00%"), "{text}");
        assert!(text.contains("3 to 3"));
        assert!(text.contains("Evicted per round:   4 to 4"));
        assert!(!text.contains("Adversarial"));
    }

    #[test]
    fn thresholds_print_compactly() {
        assert_eq!(threshold_percent(0.003), "0.3");
        assert_eq!(threshold_percent(0.00002), "0.002");
        assert_eq!(threshold_percent(0.01), "1");
    }

    #[test]
    fn adversarial_line_flags_best_effort() {
        let summary = AdversarialSummary {
            members: 3,
            target_weight: 10.0,
            achieved_weight: 8.0,
            complete: false,
        };
        let line = format_adversarial(&summary, 100.0);
        assert!(line.contains("8.00%"));
        assert!(line.contains("best effort"));
    }
}
