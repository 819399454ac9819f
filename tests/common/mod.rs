//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use ev_price_sim::config::ScenarioConfig;
use ev_price_sim::io::series::RecommendationSeries;
use ev_price_sim::sim::engine::{Session, SessionReport};
use ev_price_sim::sim::pricing::PricingStrategy;
use ev_price_sim::sim::scripted::{ScriptedSimulator, ScriptedVehicle};
use ev_price_sim::sim::types::{ChargingStation, SessionParams, StationTally, StepOutcome};

/// Lane shared by the single-lane fixtures.
pub const LANE: &str = "L";

/// Session parameters with off-peak prices all night, so a soc=0 vehicle
/// with no queue ahead accepts with certainty, and no station cooldown.
pub fn certain_acceptance() -> SessionParams {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.strategy = PricingStrategy::TimeOfUse;
    cfg.simulation.max_steps = 150;
    cfg.pricing.start_hour = 23;
    cfg.acceptance.cooldown_s = 0.0;
    cfg.session_params()
}

/// Session parameters from the default configuration with `strategy`.
pub fn params(strategy: PricingStrategy) -> SessionParams {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.strategy = strategy;
    cfg.session_params()
}

/// A 200 m lane with one station spanning 50..90 m.
pub fn single_station() -> ScriptedSimulator {
    ScriptedSimulator::new(1.0)
        .with_lane(LANE, 200.0)
        .with_station("CS_0", LANE, 50.0, 90.0)
}

/// A slow vehicle starting at the lane head, so it is offered a stop on
/// many consecutive steps before reaching the station.
pub fn slow_ev(id: &str) -> ScriptedVehicle {
    ScriptedVehicle::new(id, LANE).speed(1.0)
}

/// Everything observed over one complete session run.
pub struct Run {
    pub stations: Vec<ChargingStation>,
    pub outcomes: Vec<StepOutcome>,
    pub tallies: Vec<StationTally>,
    pub stop_log: Vec<(String, String)>,
    pub steps_taken: usize,
    pub report: SessionReport,
}

/// Runs a session to completion and collects its results.
pub fn run(sim: ScriptedSimulator, params: SessionParams, series: RecommendationSeries) -> Run {
    let mut session = Session::new(sim, params, series).expect("session should start");
    let stations = session.stations().to_vec();
    let outcomes = session.run().expect("run should succeed");
    let tallies = session.tallies().to_vec();
    let stop_log = session.simulator().stop_log().to_vec();
    let steps_taken = session.simulator().steps_taken();
    let report = session.finish().expect("finish should succeed");
    Run {
        stations,
        outcomes,
        tallies,
        stop_log,
        steps_taken,
        report,
    }
}
