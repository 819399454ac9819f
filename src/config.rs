//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sim::acceptance::{AcceptancePolicy, LogitCoefficients, WaitEstimator};
use crate::sim::pricing::{PricingParams, PricingStrategy, TouSchedule};
use crate::sim::types::SessionParams;
use crate::traci::LaunchOptions;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the `flat` preset. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length, seed and pricing strategy.
    pub simulation: SimulationConfig,
    /// Scenario directory and input file names.
    pub scenario: ScenarioFiles,
    pub pricing: PricingConfig,
    /// Driver battery assumptions.
    pub battery: BatteryConfig,
    pub acceptance: AcceptanceConfig,
    pub station: StationConfig,
    /// How SUMO is launched and reached.
    pub traci: TraciConfig,
    /// Scenario generation parameters.
    pub builder: BuilderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for the acceptance draws.
    pub seed: u64,
    /// Hard cap on simulation steps (must be > 0).
    pub max_steps: usize,
    pub strategy: PricingStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_steps: 7200,
            strategy: PricingStrategy::Flat,
        }
    }
}

/// Scenario directory and the file names inside it. Relative names are
/// resolved against `dir`; the builder writes the same files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioFiles {
    pub dir: PathBuf,
    pub net: PathBuf,
    /// EV-tagged routes.
    pub routes: PathBuf,
    /// Additional file with the charging stations.
    pub additional: PathBuf,
    /// Recommended-action CSV for the `ppo_*` strategies.
    pub recommendations: PathBuf,
}

impl Default for ScenarioFiles {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            net: PathBuf::from("ev_map.net.xml"),
            routes: PathBuf::from("ev_routes_ev_600.rou.xml"),
            additional: PathBuf::from("additional_stop.add.xml"),
            recommendations: PathBuf::from("ev_users_with_pricing_action.csv"),
        }
    }
}

impl ScenarioFiles {
    /// Joins `name` onto the scenario directory unless it is absolute.
    pub fn resolve(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.dir.join(name)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    /// Base price ($/kWh).
    pub base: f64,
    /// Price change per unit of recommended action ($/kWh).
    pub spread: f64,
    /// Seconds per recommendation row under `ppo_time`.
    pub period_s: f64,
    /// Wall-clock hour at simulation time zero (time-of-use).
    pub start_hour: u32,
    pub start_minute: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base: 0.30,
            spread: 0.30,
            period_s: 120.0,
            start_hour: 21,
            start_minute: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Assumed vehicle battery capacity (kWh).
    pub capacity_kwh: f64,
    /// SOC a charging vehicle charges up to.
    pub target_soc: f64,
    /// Vehicles above this SOC are not offered a stop.
    pub soc_threshold: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 50.0,
            target_soc: 0.70,
            soc_threshold: 0.30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcceptanceConfig {
    /// Minimum seconds between acceptances at one station.
    pub cooldown_s: f64,
    pub logit: LogitCoefficients,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            cooldown_s: 90.0,
            logit: LogitCoefficients::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    /// Rated power assumed for every station (kW).
    pub power_kw: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self { power_kw: 50.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraciConfig {
    /// Launch `sumo-gui` instead of `sumo`.
    pub gui: bool,
    /// Fixed TraCI port; a free port is picked when unset.
    pub port: Option<u16>,
    pub connect_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for TraciConfig {
    fn default() -> Self {
        Self {
            gui: false,
            port: None,
            connect_attempts: 50,
            retry_delay_ms: 200,
        }
    }
}

/// Scenario generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Junctions per grid side.
    pub grid_number: u32,
    /// Grid edge length (m).
    pub grid_length: f64,
    pub lane_number: u32,
    /// Default lane speed (m/s).
    pub default_speed: f64,
    /// Last trip departure (s).
    pub end_time_s: f64,
    /// Seconds between trip departures.
    pub trip_period_s: f64,
    pub trip_seed: u64,
    /// Interpreter for `randomTrips.py`.
    pub python: String,
    /// Minimum straight-line trip distance (m).
    pub min_distance: f64,
    pub trips_file: PathBuf,
    /// Routes written by duarouter before EV tagging.
    pub base_routes_file: PathBuf,
    /// Stations placed on the longest lanes into the central junction.
    pub station_count: usize,
    pub station_power_kw: f64,
    pub station_efficiency: f64,
    pub ev: EvTypeConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            grid_number: 3,
            grid_length: 200.0,
            lane_number: 1,
            default_speed: 13.89,
            end_time_s: 3600.0,
            trip_period_s: 6.0,
            trip_seed: 42,
            python: "python3".to_string(),
            min_distance: 50.0,
            trips_file: PathBuf::from("trips_600.trips"),
            base_routes_file: PathBuf::from("ev_routes_base_600.rou.xml"),
            station_count: 4,
            station_power_kw: 50.0,
            station_efficiency: 0.9,
            ev: EvTypeConfig::default(),
        }
    }
}

/// The `EV` vehicle type injected into the routes file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvTypeConfig {
    pub max_speed: f64,
    pub accel: f64,
    pub decel: f64,
    /// Battery capacity parameter written to the vehicle type.
    pub battery_capacity: f64,
    pub vehicle_mass: f64,
    pub power_maximum: f64,
    pub recuperation_efficiency: f64,
    pub initial_soc: f64,
    pub minimum_soc: f64,
}

impl Default for EvTypeConfig {
    fn default() -> Self {
        Self {
            max_speed: 13.89,
            accel: 2.0,
            decel: 4.5,
            battery_capacity: 50.0,
            vehicle_mass: 1500.0,
            power_maximum: 80.0,
            recuperation_efficiency: 0.6,
            initial_soc: 0.25,
            minimum_soc: 0.10,
        }
    }
}

/// Output files, resolved against the scenario directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub kpi_csv: PathBuf,
    pub prices_csv: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kpi_csv: PathBuf::from("kpi_perfect2x2.csv"),
            prices_csv: PathBuf::from("controlled_prices.csv"),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"pricing.period_s"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn check(errors: &mut Vec<ConfigError>, ok: bool, field: &str, message: &str) {
    if !ok {
        errors.push(ConfigError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl ScenarioConfig {
    /// Available preset names, one per pricing strategy.
    pub const PRESETS: &[&str] = &["flat", "tou", "ppo_csv", "ppo_time"];

    fn with_strategy(strategy: PricingStrategy) -> Self {
        Self {
            simulation: SimulationConfig {
                strategy,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "flat" => Ok(Self::with_strategy(PricingStrategy::Flat)),
            "tou" => Ok(Self::with_strategy(PricingStrategy::TimeOfUse)),
            "ppo_csv" => Ok(Self::with_strategy(PricingStrategy::RecommendedByStep)),
            "ppo_time" => Ok(Self::with_strategy(PricingStrategy::RecommendedByPeriod)),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let e = &mut errors;

        check(e, self.simulation.max_steps > 0, "simulation.max_steps", "must be > 0");

        let p = &self.pricing;
        check(e, p.base > 0.0, "pricing.base", "must be > 0");
        check(e, p.spread >= 0.0, "pricing.spread", "must be >= 0");
        check(e, p.period_s > 0.0, "pricing.period_s", "must be > 0");
        check(e, p.start_hour < 24, "pricing.start_hour", "must be in [0, 23]");
        check(e, p.start_minute < 60, "pricing.start_minute", "must be in [0, 59]");

        let b = &self.battery;
        check(e, b.capacity_kwh > 0.0, "battery.capacity_kwh", "must be > 0");
        check(
            e,
            (0.0..=1.0).contains(&b.target_soc),
            "battery.target_soc",
            "must be in [0.0, 1.0]",
        );
        check(
            e,
            (0.0..=1.0).contains(&b.soc_threshold),
            "battery.soc_threshold",
            "must be in [0.0, 1.0]",
        );

        check(
            e,
            self.acceptance.cooldown_s >= 0.0,
            "acceptance.cooldown_s",
            "must be >= 0",
        );
        check(e, self.station.power_kw > 0.0, "station.power_kw", "must be > 0");
        check(
            e,
            self.traci.connect_attempts > 0,
            "traci.connect_attempts",
            "must be > 0",
        );

        let bl = &self.builder;
        check(e, bl.grid_number >= 2, "builder.grid_number", "must be >= 2");
        check(e, bl.grid_length > 0.0, "builder.grid_length", "must be > 0");
        check(e, bl.lane_number > 0, "builder.lane_number", "must be > 0");
        check(e, bl.trip_period_s > 0.0, "builder.trip_period_s", "must be > 0");
        check(e, bl.station_count > 0, "builder.station_count", "must be > 0");
        check(
            e,
            (0.0..=1.0).contains(&bl.station_efficiency),
            "builder.station_efficiency",
            "must be in [0.0, 1.0]",
        );

        errors
    }

    pub fn pricing_params(&self) -> PricingParams {
        let p = &self.pricing;
        PricingParams {
            strategy: self.simulation.strategy,
            base: p.base,
            spread: p.spread,
            period_s: p.period_s,
            tou: TouSchedule::starting_at(p.start_hour, p.start_minute),
        }
    }

    /// Session parameters derived from this configuration.
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            pricing: self.pricing_params(),
            acceptance: AcceptancePolicy {
                coefficients: self.acceptance.logit,
                strategy: self.simulation.strategy,
            },
            wait: WaitEstimator::new(self.battery.capacity_kwh, self.battery.target_soc),
            soc_threshold: self.battery.soc_threshold,
            cooldown_s: self.acceptance.cooldown_s,
            station_power_kw: self.station.power_kw,
            max_steps: self.simulation.max_steps,
            seed: self.simulation.seed,
        }
    }

    /// SUMO launch options for the configured scenario files.
    pub fn launch_options(&self) -> LaunchOptions {
        let files = &self.scenario;
        LaunchOptions {
            gui: self.traci.gui,
            net: files.resolve(&files.net),
            routes: files.resolve(&files.routes),
            additional: files.resolve(&files.additional),
            port: self.traci.port,
            connect_attempts: self.traci.connect_attempts,
            retry_delay: Duration::from_millis(self.traci.retry_delay_ms),
        }
    }

    pub fn recommendations_path(&self) -> PathBuf {
        self.scenario.resolve(&self.scenario.recommendations)
    }

    pub fn kpi_csv_path(&self) -> PathBuf {
        self.scenario.resolve(&self.output.kpi_csv)
    }

    pub fn prices_csv_path(&self) -> PathBuf {
        self.scenario.resolve(&self.output.prices_csv)
    }
}
