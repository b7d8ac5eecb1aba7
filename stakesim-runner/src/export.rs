//! Export: JSON manifest and per-trial CSV.
//!
//! These files are an optional reporting artifact, written only when a run
//! asks for an output directory. The engine never reads them back and no
//! simulation state is resumed from them; `load_artifacts` exists for
//! inspecting finished runs.
//!
//! Persisted manifests carry a `schema_version`. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use stakesim_core::Statistic;

use crate::batch::BatchResult;
use crate::config::RunConfig;
use crate::population::PopulationSummary;

pub const SCHEMA_VERSION: u32 = 1;

/// Everything needed to reproduce and inspect a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub config: RunConfig,
    pub population: PopulationSummary,
    pub batch: BatchResult,
}

impl RunManifest {
    pub fn new(config: RunConfig, population: PopulationSummary, batch: BatchResult) -> Result<Self> {
        let run_id = run_id(&config)?;
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            config,
            population,
            batch,
        })
    }
}

/// Content hash of a run configuration (BLAKE3 over its JSON form).
pub fn run_id(config: &RunConfig) -> Result<String> {
    let json = serde_json::to_string(config).context("failed to serialize RunConfig")?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize RunManifest to JSON")
}

pub fn import_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize RunManifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per trial: seed, rounds, then `<stat>_min` / `<stat>_max` for
/// every statistic and the three tertile counts. Missing statistics are
/// left empty.
pub fn export_trials_csv(batch: &BatchResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["trial".to_string(), "seed".to_string(), "rounds".to_string()];
    for stat in Statistic::ALL {
        header.push(format!("{}_min", stat.name()));
        header.push(format!("{}_max", stat.name()));
    }
    header.extend(["over_third", "over_half", "over_two_thirds"].map(String::from));
    wtr.write_record(&header)?;

    for trial in &batch.trials {
        let result = &trial.outcome.result;
        let mut row = vec![
            trial.trial.to_string(),
            trial.seed.to_string(),
            result.rounds.to_string(),
        ];
        for stat in Statistic::ALL {
            match result.get(stat) {
                Some(e) => {
                    row.push(format!("{:.6}", e.min));
                    row.push(format!("{:.6}", e.max));
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        row.push(result.tertiles.over_third.to_string());
        row.push(result.tertiles.over_half.to_string());
        row.push(result.tertiles.over_two_thirds.to_string());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save `manifest.json` and `trials.csv` under `output_dir/run_<id prefix>/`.
///
/// Returns the created directory.
pub fn save_artifacts(manifest: &RunManifest, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = manifest.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(manifest)?)?;
    std::fs::write(run_dir.join("trials.csv"), export_trials_csv(&manifest.batch)?)?;

    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<RunManifest> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
