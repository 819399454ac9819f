//! Narrow interface to the external traffic simulator.

use thiserror::Error;

use crate::traci::TraciError;

/// Errors reported by a [`TrafficSimulator`].
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Traci(#[from] TraciError),

    #[error("unknown {kind} \"{id}\"")]
    UnknownObject { kind: &'static str, id: String },

    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Static charging-station geometry as reported by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct StationGeometry {
    pub lane: String,
    pub start_pos: f64,
    pub end_pos: f64,
}

/// Operations the charging session needs from a traffic simulator.
///
/// Implemented by the TraCI client for a live SUMO process and by
/// [`ScriptedSimulator`](super::scripted::ScriptedSimulator) for tests.
pub trait TrafficSimulator {
    /// Advances the simulation by one step.
    fn step(&mut self) -> Result<(), SimError>;

    /// Current simulation time (s).
    fn time_s(&mut self) -> Result<f64, SimError>;

    /// Vehicles still running or waiting to depart.
    fn min_expected_vehicles(&mut self) -> Result<i32, SimError>;

    /// Charging-station ids in simulator order.
    fn charging_station_ids(&mut self) -> Result<Vec<String>, SimError>;

    fn charging_station(&mut self, id: &str) -> Result<StationGeometry, SimError>;

    /// Vehicles on `lane` during the last step, in simulator order.
    fn lane_vehicle_ids(&mut self, lane: &str) -> Result<Vec<String>, SimError>;

    /// Position of a vehicle along its current lane (m).
    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<f64, SimError>;

    /// Vehicle speed (m/s).
    fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64, SimError>;

    /// Generic vehicle parameter; an unset key reads as an empty string.
    fn vehicle_parameter(&mut self, vehicle: &str, key: &str) -> Result<String, SimError>;

    /// Sends a vehicle to a charging-station stop with open-ended duration.
    fn set_charging_station_stop(&mut self, vehicle: &str, station: &str)
    -> Result<(), SimError>;

    /// Ends the simulation and releases the connection.
    fn close(&mut self) -> Result<(), SimError>;
}
