//! TOML run configuration.
//!
//! ```toml
//! [population]
//! path = "validators_stakes_epoch_600"
//! interpolate = 10000
//!
//! [simulation]
//! samples = 200
//! rounds = 1000
//! rotation_percent = 10
//! rotation_policy = "weight_budget"
//! seed = 42
//!
//! [simulation.adversarial]
//! percent = 5
//!
//! [batch]
//! trials = 8
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stakesim_core::{SimConfig, SimError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] SimError),

    #[error("invalid batch settings: {0}")]
    Batch(String),
}

/// Where the population comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub path: PathBuf,
    /// Upsample to this many members before running.
    #[serde(default)]
    pub interpolate: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("validators_stakes_epoch_600"),
            interpolate: Some(10_000),
        }
    }
}

/// Independent-trial settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Worker threads; `None` uses the global rayon pool.
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_trials() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            threads: None,
        }
    }
}

/// Complete, reproducible description of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub simulation: SimConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.batch.validate()
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::Batch("trials must be positive".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Batch("threads must be positive".into()));
        }
        Ok(())
    }
}
