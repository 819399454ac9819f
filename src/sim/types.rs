//! Core session types: stations, per-step records, and session parameters.

use std::fmt;

use serde::Serialize;

use super::acceptance::{AcceptancePolicy, WaitEstimator};
use super::pricing::PricingParams;

/// Vehicles slower than this (m/s) count as stationary.
pub const STATIONARY_SPEED: f64 = 0.1;

/// A charging station as reported by the traffic simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingStation {
    pub id: String,
    /// Lane the station sits on.
    pub lane: String,
    /// Start of the station span on the lane (m).
    pub start_pos: f64,
    /// End of the station span on the lane (m).
    pub end_pos: f64,
    /// Rated power (kW).
    pub power_kw: f64,
}

impl ChargingStation {
    /// Returns `true` when `lane_pos` lies within `[start_pos, end_pos]`.
    pub fn spans(&self, lane_pos: f64) -> bool {
        self.start_pos <= lane_pos && lane_pos <= self.end_pos
    }

    /// Returns `true` for a stationary vehicle inside the station span.
    pub fn occupied_by(&self, lane_pos: f64, speed: f64) -> bool {
        self.spans(lane_pos) && speed < STATIONARY_SPEED
    }

    /// Returns `true` when a vehicle at `lane_pos` has not yet reached the span.
    pub fn is_approached_from(&self, lane_pos: f64) -> bool {
        lane_pos < self.start_pos
    }
}

/// Prices recorded for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSample {
    /// Step index.
    pub step: usize,
    /// Simulation time after advancing (s).
    pub time_s: f64,
    /// Discrete decision price ($/kWh).
    pub decision_price: f64,
    /// Smoothed billing price ($/kWh).
    pub charge_price: f64,
}

/// Running utilization and revenue for one station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationTally {
    /// Steps in which the station was occupied.
    pub occupied_steps: usize,
    /// Accumulated revenue ($).
    pub revenue: f64,
}

/// Everything a session needs besides the simulator and the pricer.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub pricing: PricingParams,
    pub acceptance: AcceptancePolicy,
    pub wait: WaitEstimator,
    /// Vehicles above this SOC are never offered a stop.
    pub soc_threshold: f64,
    /// Minimum seconds between acceptances at one station.
    pub cooldown_s: f64,
    /// Station power used for every station (kW).
    pub station_power_kw: f64,
    /// Hard cap on simulation steps.
    pub max_steps: usize,
    /// Seed for the acceptance draws.
    pub seed: u64,
}

/// What happened during one session step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub prices: PriceSample,
    /// Vehicles sent to a station this step, as `(vehicle, station)`.
    pub accepted: Vec<(String, String)>,
    /// Total charging power drawn this step (kW).
    pub total_power_kw: f64,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step={:>5} t={:>7.0}s | decision={:.2} charge={:.4} | power={:>6.1} kW | accepted={}",
            self.prices.step,
            self.prices.time_s,
            self.prices.decision_price,
            self.prices.charge_price,
            self.total_power_kw,
            self.accepted.len(),
        )
    }
}
