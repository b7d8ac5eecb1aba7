//! StakeSim Runner: everything around the rotation engine.
//!
//! This crate builds on `stakesim-core` to provide:
//! - Population file loading and interpolation
//! - TOML run configuration
//! - Independent multi-trial batches (rayon, seed hierarchy)
//! - Console report formatting
//! - JSON manifest and per-trial CSV export

pub mod batch;
pub mod config;
pub mod export;
pub mod population;
pub mod report;

pub use batch::{run_batch, trial_seed, BatchError, BatchResult, TrialResult};
pub use config::{BatchConfig, ConfigError, PopulationConfig, RunConfig};
pub use export::{
    export_json, export_trials_csv, import_json, load_artifacts, save_artifacts, RunManifest,
    SCHEMA_VERSION,
};
pub use population::{
    interpolate, load_population, parse_weights, read_weights, summarize_population, LoadError,
    PopulationSummary,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<BatchConfig>();
        assert_sync::<BatchConfig>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<BatchResult>();
        assert_sync::<BatchResult>();
        assert_send::<TrialResult>();
        assert_sync::<TrialResult>();
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<BatchError>();
        assert_sync::<BatchError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
