//! StakeSim CLI: rotation simulation over a stake-weighted population.
//!
//! Commands:
//! - `run` simulate rotation rounds (optionally several independent trials)
//! - `population` summarize a stake file without running anything
//!
//! Settings come from built-in defaults, then an optional TOML `--config`
//! file, then individual flags, each layer overriding the previous one.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use stakesim_core::{AdversarialConfig, RotationPolicy, SubsetPolicy, Thresholds};
use stakesim_runner::report::{
    format_adversarial, format_batch, format_population, format_run_header,
};
use stakesim_runner::{
    load_population, run_batch, save_artifacts, summarize_population, RunConfig, RunManifest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stakesim",
    about = "StakeSim CLI: committee rotation over stake-weighted validators"
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate rotation rounds and report min/max statistics.
    Run {
        /// Path to a TOML run config. Flags given alongside it take precedence.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        population: PopulationArgs,

        #[command(flatten)]
        simulation: SimulationArgs,

        /// Independent trials to run [default: 1].
        #[arg(long)]
        trials: Option<usize>,

        /// Worker threads for trials. Defaults to all cores.
        #[arg(long)]
        threads: Option<usize>,

        /// Write manifest.json and trials.csv under this directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Summarize a stake file: member count, total weight, high/low counts.
    Population {
        #[command(flatten)]
        population: PopulationArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

#[derive(Args)]
struct PopulationArgs {
    /// Stake file, one weight per line [default: ./validators_stakes_epoch_600].
    #[arg(long)]
    stakes: Option<PathBuf>,

    /// Upsample the population to this many members; 0 disables [default: 10000].
    #[arg(long)]
    interpolate: Option<usize>,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Members above this share of total weight count as high [default: 0.003].
    #[arg(long)]
    high_fraction: Option<f64>,

    /// Members below this share of total weight count as low [default: 0.00002].
    #[arg(long)]
    low_fraction: Option<f64>,
}

#[derive(Args)]
struct SimulationArgs {
    /// Committee size drawn each round [default: 200].
    #[arg(long)]
    samples: Option<usize>,

    /// Number of rounds [default: 1000].
    #[arg(long)]
    rounds: Option<usize>,

    /// Percent rotated out every round [default: 10].
    #[arg(long)]
    rotation: Option<f64>,

    /// How the rotated share is measured [default: weight-budget].
    #[arg(long, value_enum)]
    rotation_policy: Option<PolicyArg>,

    /// Percent of total weight held by non-conforming members; 0 disables [default: 5].
    #[arg(long)]
    non_conforming: Option<f64>,

    /// How the non-conforming set is chosen [default: bounded-retry].
    #[arg(long, value_enum)]
    adversarial_policy: Option<AdversarialPolicyArg>,

    /// Master seed [default: 0].
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// A fixed number of members per round.
    FixedQuota,
    /// A share of the committee's weight per round.
    WeightBudget,
}

impl From<PolicyArg> for RotationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FixedQuota => RotationPolicy::FixedQuota,
            PolicyArg::WeightBudget => RotationPolicy::WeightBudget,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AdversarialPolicyArg {
    BoundedRetry,
    Greedy,
}

impl From<AdversarialPolicyArg> for SubsetPolicy {
    fn from(arg: AdversarialPolicyArg) -> Self {
        match arg {
            AdversarialPolicyArg::BoundedRetry => SubsetPolicy::bounded_retry(),
            AdversarialPolicyArg::Greedy => SubsetPolicy::GreedyShrinking,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            population,
            simulation,
            trials,
            threads,
            output,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfig::from_file(&path)?,
                None => RunConfig::default(),
            };
            population.apply(&mut run_config);
            simulation.apply(&mut run_config);
            if let Some(trials) = trials {
                run_config.batch.trials = trials;
            }
            if threads.is_some() {
                run_config.batch.threads = threads;
            }
            run_config.validate()?;
            run_simulation(run_config, output)
        }
        Commands::Population {
            population,
            thresholds,
        } => {
            let mut run_config = RunConfig::default();
            population.apply(&mut run_config);
            thresholds.apply(&mut run_config.simulation.thresholds);
            run_population(&run_config)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl PopulationArgs {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(path) = &self.stakes {
            config.population.path = path.clone();
        }
        match self.interpolate {
            Some(0) => config.population.interpolate = None,
            Some(n) => config.population.interpolate = Some(n),
            None => {}
        }
    }
}

impl ThresholdArgs {
    fn apply(&self, thresholds: &mut Thresholds) {
        if let Some(high) = self.high_fraction {
            thresholds.high_fraction = high;
        }
        if let Some(low) = self.low_fraction {
            thresholds.low_fraction = low;
        }
    }
}

impl SimulationArgs {
    fn apply(&self, config: &mut RunConfig) {
        let sim = &mut config.simulation;
        if let Some(samples) = self.samples {
            sim.samples = samples;
        }
        if let Some(rounds) = self.rounds {
            sim.rounds = rounds;
        }
        if let Some(rotation) = self.rotation {
            sim.rotation_percent = rotation;
        }
        if let Some(policy) = self.rotation_policy {
            sim.rotation_policy = policy.into();
        }
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        match self.non_conforming {
            Some(percent) if percent == 0.0 => sim.adversarial = None,
            Some(percent) => {
                let policy = sim
                    .adversarial
                    .as_ref()
                    .map(|a| a.policy)
                    .unwrap_or_default();
                sim.adversarial = Some(AdversarialConfig { percent, policy });
            }
            None => {}
        }
        if let (Some(policy), Some(adversarial)) =
            (self.adversarial_policy, sim.adversarial.as_mut())
        {
            adversarial.policy = policy.into();
        }
        self.thresholds.apply(&mut sim.thresholds);
    }
}

fn run_population(config: &RunConfig) -> Result<()> {
    let population = load_population(&config.population.path, config.population.interpolate)?;
    let summary = summarize_population(&population, &config.simulation.thresholds);
    println!("{}", format_population(&summary));
    Ok(())
}

fn run_simulation(config: RunConfig, output: Option<PathBuf>) -> Result<()> {
    let population = load_population(&config.population.path, config.population.interpolate)?;
    let summary = summarize_population(&population, &config.simulation.thresholds);
    let total = population.total();

    println!("{}", format_population(&summary));
    println!(
        "{}",
        format_run_header(&config.simulation, population.len(), config.batch.trials)
    );

    let batch = run_batch(&population, &config.simulation, &config.batch)?;
    info!(
        trials = batch.trials.len(),
        rounds = batch.combined.rounds,
        adversarial_complete = batch.adversarial_complete(),
        "run finished"
    );

    // The adversarial set is seeded from each trial's own seed.
    if let Some(first) = batch.trials.first() {
        if let Some(adversarial) = &first.outcome.adversarial {
            println!("{}", format_adversarial(adversarial, total));
        }
    }
    if !batch.adversarial_complete() {
        println!("WARNING: adversarial set fell short of its target in at least one trial");
    }
    println!();
    println!("{}", format_batch(&batch, &config.simulation, total));

    if let Some(dir) = output {
        let manifest = RunManifest::new(config, summary, batch)?;
        let run_dir = save_artifacts(&manifest, &dir)?;
        info!(run_id = %manifest.run_id, dir = %run_dir.display(), "artifacts written");
        println!();
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn run_args(args: &[&str]) -> (PopulationArgs, SimulationArgs) {
        let cli = Cli::try_parse_from(["stakesim", "run"].iter().chain(args).copied()).unwrap();
        match cli.command {
            Commands::Run {
                population,
                simulation,
                ..
            } => (population, simulation),
            Commands::Population { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let (population, simulation) = run_args(&[
            "--samples",
            "50",
            "--rotation",
            "25",
            "--rotation-policy",
            "fixed-quota",
            "--stakes",
            "stakes.txt",
            "--high-fraction",
            "0.01",
        ]);
        let mut config = RunConfig::default();
        population.apply(&mut config);
        simulation.apply(&mut config);

        assert_eq!(config.simulation.samples, 50);
        assert_eq!(config.simulation.rounds, 1000);
        assert_eq!(config.simulation.rotation_percent, 25.0);
        assert_eq!(config.simulation.rotation_policy, RotationPolicy::FixedQuota);
        assert_eq!(config.simulation.thresholds.high_fraction, 0.01);
        assert_eq!(config.population.path, PathBuf::from("stakes.txt"));
        assert_eq!(config.population.interpolate, Some(10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_disables_adversarial_set_and_interpolation() {
        let (population, simulation) = run_args(&["--non-conforming", "0", "--interpolate", "0"]);
        let mut config = RunConfig::default();
        population.apply(&mut config);
        simulation.apply(&mut config);
        assert_eq!(config.simulation.adversarial, None);
        assert_eq!(config.population.interpolate, None);
    }

    #[test]
    fn adversarial_policy_flag_applies_to_configured_set() {
        let (_, simulation) = run_args(&["--non-conforming", "12", "--adversarial-policy", "greedy"]);
        let mut config = RunConfig::default();
        simulation.apply(&mut config);
        let adversarial = config.simulation.adversarial.unwrap();
        assert_eq!(adversarial.percent, 12.0);
        assert_eq!(adversarial.policy, SubsetPolicy::GreedyShrinking);
    }
}
