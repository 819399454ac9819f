//! Command-line arguments and config resolution.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigError, ScenarioConfig};
use crate::sim::pricing::PricingStrategy;

#[derive(Debug, Parser)]
#[command(name = "ev-price-sim")]
#[command(author, version, about = "EV charging price-control simulator on SUMO")]
#[command(
    long_about = "Generates a synthetic EV road-network scenario with SUMO tools and runs a\n\
    price-driven charging control loop against it over TraCI.\n\
    \nExamples:\n  \
    ev-price-sim build-scenario --preset flat\n  \
    ev-price-sim run --preset tou\n  \
    ev-price-sim run --scenario grid.toml --strategy ppo_time --seed 7"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the pricing and charging loop against a SUMO scenario
    Run(RunArgs),

    /// Generate network, EV routes and charging stations with SUMO tools
    BuildScenario(BuildArgs),
}

/// Where the scenario configuration comes from.
#[derive(Debug, Args)]
pub struct ConfigSource {
    /// Scenario TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in preset (flat, tou, ppo_csv, ppo_time); default flat
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Override the pricing strategy
    #[arg(long, value_enum)]
    pub strategy: Option<PricingStrategy>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Launch sumo-gui instead of sumo
    #[arg(long)]
    pub gui: bool,

    /// Write the KPI CSV here instead of the configured path
    #[arg(long, value_name = "PATH")]
    pub kpi_out: Option<PathBuf>,

    /// Write the price CSV here instead of the configured path
    #[arg(long, value_name = "PATH")]
    pub prices_out: Option<PathBuf>,

    /// Serve the results over HTTP after the run
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Write the scenario into this directory instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

impl ConfigSource {
    /// Loads the TOML file, the named preset, or the `flat` preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be parsed or the preset
    /// is unknown.
    pub fn load(&self) -> Result<ScenarioConfig, ConfigError> {
        match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(path),
            (None, Some(name)) => ScenarioConfig::from_preset(name),
            (None, None) => ScenarioConfig::from_preset("flat"),
        }
    }
}

impl RunArgs {
    /// Loads the configuration and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration cannot be loaded.
    pub fn config(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = self.source.load()?;
        if let Some(strategy) = self.strategy {
            cfg.simulation.strategy = strategy;
        }
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        if self.gui {
            cfg.traci.gui = true;
        }
        if let Some(path) = &self.kpi_out {
            cfg.output.kpi_csv = path.clone();
        }
        if let Some(path) = &self.prices_out {
            cfg.output.prices_csv = path.clone();
        }
        Ok(cfg)
    }
}

impl BuildArgs {
    /// Loads the configuration and applies the output directory override.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration cannot be loaded.
    pub fn config(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = self.source.load()?;
        if let Some(dir) = &self.out_dir {
            cfg.scenario.dir = dir.clone();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ev-price-sim").chain(args.iter().copied()))
    }

    fn run_args(args: &[&str]) -> RunArgs {
        match parse(args).expect("parse should succeed").command {
            Commands::Run(run) => run,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn supports_scenario_cli() {
        let run = run_args(&["run", "--scenario", "grid.toml"]);
        assert_eq!(
            run.source.scenario.as_deref().and_then(|p| p.to_str()),
            Some("grid.toml")
        );
        assert!(run.source.preset.is_none());
    }

    #[test]
    fn supports_preset_cli() {
        let run = run_args(&["run", "--preset", "tou"]);
        assert_eq!(run.source.preset.as_deref(), Some("tou"));
        let cfg = run.config().unwrap();
        assert_eq!(cfg.simulation.strategy, PricingStrategy::TimeOfUse);
    }

    #[test]
    fn scenario_and_preset_are_mutually_exclusive() {
        assert!(parse(&["run", "--scenario", "a.toml", "--preset", "flat"]).is_err());
    }

    #[test]
    fn default_preset_is_flat() {
        let cfg = run_args(&["run"]).config().unwrap();
        assert_eq!(cfg.simulation.strategy, PricingStrategy::Flat);
    }

    #[test]
    fn overrides_apply() {
        let run = run_args(&[
            "run",
            "--strategy",
            "ppo_time",
            "--seed",
            "7",
            "--gui",
            "--kpi-out",
            "out/kpi.csv",
        ]);
        let cfg = run.config().unwrap();
        assert_eq!(cfg.simulation.strategy, PricingStrategy::RecommendedByPeriod);
        assert_eq!(cfg.simulation.seed, 7);
        assert!(cfg.traci.gui);
        assert_eq!(cfg.output.kpi_csv, PathBuf::from("out/kpi.csv"));
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(parse(&["run", "--strategy", "surge"]).is_err());
    }

    #[test]
    fn unknown_preset_is_a_config_error() {
        let err = run_args(&["run", "--preset", "nope"]).config().unwrap_err();
        assert_eq!(err.field, "preset");
    }

    #[test]
    fn build_scenario_out_dir() {
        let cli = parse(&["build-scenario", "--out-dir", "scenarios/a"]).unwrap();
        let Commands::BuildScenario(build) = cli.command else {
            panic!("expected build-scenario");
        };
        let cfg = build.config().unwrap();
        assert_eq!(cfg.scenario.dir, PathBuf::from("scenarios/a"));
    }
}
