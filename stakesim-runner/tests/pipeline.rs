//! Integration tests for the runner pipeline: file -> population -> batch -> artifacts.

use std::io::Write;

use stakesim_core::{RotationPolicy, Statistic, Thresholds};
use stakesim_runner::{
    export_trials_csv, load_artifacts, load_population, read_weights, run_batch, save_artifacts,
    summarize_population, LoadError, RunConfig, RunManifest, SCHEMA_VERSION,
};
use tempfile::{NamedTempFile, TempDir};

fn write_stakes(weights: &[f64]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for w in weights {
        writeln!(file, "{w}").unwrap();
    }
    file.flush().unwrap();
    file
}

fn heavy_tail(n: usize) -> Vec<f64> {
    (1..=n).map(|i| (i as f64).powi(3) + 10.0).collect()
}

fn run_config(path: &std::path::Path, interpolate: Option<usize>, trials: usize) -> RunConfig {
    let toml = format!(
        r#"
[population]
path = "{}"
{}

[simulation]
samples = 20
rounds = 30
rotation_percent = 10.0
rotation_policy = "weight_budget"
seed = 11

[simulation.thresholds]
high_fraction = 0.01
low_fraction = 0.0001

[simulation.adversarial]
percent = 10.0

[batch]
trials = {trials}
threads = 2
"#,
        path.display().to_string().replace('\\', "/"),
        interpolate.map(|n| format!("interpolate = {n}")).unwrap_or_default(),
    );
    RunConfig::from_toml(&toml).unwrap()
}

#[test]
fn reads_weights_from_file() {
    let file = write_stakes(&[3.0, 1.5, 0.0]);
    assert_eq!(read_weights(file.path()).unwrap(), vec![3.0, 1.5, 0.0]);
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = read_weights(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn blank_file_is_empty_error() {
    let file = write_stakes(&[]);
    assert!(matches!(read_weights(file.path()), Err(LoadError::Empty { .. })));
}

#[test]
fn load_population_interpolates_to_target() {
    let file = write_stakes(&heavy_tail(50));
    let population = load_population(file.path(), Some(200)).unwrap();
    assert_eq!(population.len(), 200);
    assert!(population.weights().windows(2).all(|w| w[0] <= w[1]));

    let untouched = load_population(file.path(), Some(10)).unwrap();
    assert_eq!(untouched.weights(), heavy_tail(50).as_slice());
}

#[test]
fn full_pipeline_round_trips_through_artifacts() {
    let file = write_stakes(&heavy_tail(80));
    let config = run_config(file.path(), Some(300), 3);
    let population =
        load_population(&config.population.path, config.population.interpolate).unwrap();
    let summary = summarize_population(&population, &config.simulation.thresholds);
    assert_eq!(summary.members, 300);

    let batch = run_batch(&population, &config.simulation, &config.batch).unwrap();
    assert_eq!(batch.trials.len(), 3);
    assert_eq!(batch.combined.rounds, 90);
    assert!(batch.combined.get(Statistic::AdversarialRatio).is_some());

    let manifest = RunManifest::new(config.clone(), summary, batch).unwrap();
    let out = TempDir::new().unwrap();
    let run_dir = save_artifacts(&manifest, out.path()).unwrap();
    assert!(run_dir.join("manifest.json").exists());
    assert!(run_dir.join("trials.csv").exists());

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    assert_eq!(loaded.run_id, manifest.run_id);
    assert_eq!(loaded.config.simulation.samples, 20);
    assert_eq!(loaded.batch.trials.len(), 3);
    assert_eq!(
        loaded.batch.trials.iter().map(|t| t.seed).collect::<Vec<_>>(),
        manifest.batch.trials.iter().map(|t| t.seed).collect::<Vec<_>>()
    );
}

#[test]
fn run_id_changes_with_parameters() {
    let file = write_stakes(&heavy_tail(10));
    let a = run_config(file.path(), None, 1);
    let mut b = a.clone();
    b.simulation.seed += 1;
    assert_eq!(
        stakesim_runner::export::run_id(&a).unwrap(),
        stakesim_runner::export::run_id(&a).unwrap()
    );
    assert_ne!(
        stakesim_runner::export::run_id(&a).unwrap(),
        stakesim_runner::export::run_id(&b).unwrap()
    );
}

#[test]
fn future_schema_version_is_rejected() {
    let file = write_stakes(&heavy_tail(60));
    let config = run_config(file.path(), None, 1);
    let population = load_population(&config.population.path, None).unwrap();
    let summary = summarize_population(&population, &Thresholds::coarse());
    let batch = run_batch(&population, &config.simulation, &config.batch).unwrap();
    let mut manifest = RunManifest::new(config, summary, batch).unwrap();
    manifest.schema_version = SCHEMA_VERSION + 1;
    let json = stakesim_runner::export_json(&manifest).unwrap();
    assert!(stakesim_runner::import_json(&json).is_err());
}

#[test]
fn trials_csv_has_one_row_per_trial() {
    let file = write_stakes(&heavy_tail(100));
    let mut config = run_config(file.path(), None, 4);
    config.simulation.rotation_policy = RotationPolicy::FixedQuota;
    config.simulation.adversarial = None;
    let population = load_population(&config.population.path, None).unwrap();
    let batch = run_batch(&population, &config.simulation, &config.batch).unwrap();
    let csv = export_trials_csv(&batch).unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("trial,seed,rounds,total_weight_min,total_weight_max"));
    // No adversarial set: its columns are empty.
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let column = headers.iter().position(|h| h == "adversarial_ratio_min").unwrap();
    for record in reader.records() {
        assert_eq!(&record.unwrap()[column], "");
    }
}
