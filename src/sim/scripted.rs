//! In-memory traffic simulator with scripted single-lane kinematics.
//!
//! Vehicles depart at a given step, drive along their lane at constant speed
//! and leave once past the lane end. A vehicle sent to a charging stop halts
//! at the station start, stays for a fixed number of steps and drives on.
//! Deterministic, so sessions can be tested without a SUMO process.

use std::collections::{HashMap, HashSet};

use super::simulator::{SimError, StationGeometry, TrafficSimulator};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Pending,
    Driving,
    Charging { remaining: usize },
    Arrived,
}

/// A scripted vehicle definition.
#[derive(Debug, Clone)]
pub struct ScriptedVehicle {
    id: String,
    lane: String,
    depart_step: usize,
    position: f64,
    cruise_speed: f64,
    speed: f64,
    params: HashMap<String, String>,
    unreadable_battery: bool,
    stop: Option<String>,
    phase: Phase,
}

impl ScriptedVehicle {
    /// A vehicle on `lane` departing at step 0 from position 0 at 10 m/s.
    pub fn new(id: &str, lane: &str) -> Self {
        Self {
            id: id.to_string(),
            lane: lane.to_string(),
            depart_step: 0,
            position: 0.0,
            cruise_speed: 10.0,
            speed: 10.0,
            params: HashMap::new(),
            unreadable_battery: false,
            stop: None,
            phase: Phase::Pending,
        }
    }

    pub fn departing_at(mut self, step: usize) -> Self {
        self.depart_step = step;
        self
    }

    pub fn at(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.cruise_speed = speed;
        self.speed = speed;
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Makes every battery parameter query fail.
    pub fn unreadable_battery(mut self) -> Self {
        self.unreadable_battery = true;
        self
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Driving | Phase::Charging { .. })
    }
}

/// Scripted implementation of [`TrafficSimulator`].
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    step_length_s: f64,
    steps: usize,
    charge_dwell_steps: usize,
    lanes: HashMap<String, f64>,
    stations: Vec<(String, StationGeometry)>,
    vehicles: Vec<ScriptedVehicle>,
    refused_stops: HashSet<String>,
    stop_log: Vec<(String, String)>,
    closed: bool,
}

impl ScriptedSimulator {
    /// Creates an empty simulator advancing `step_length_s` seconds per step.
    pub fn new(step_length_s: f64) -> Self {
        Self {
            step_length_s,
            steps: 0,
            charge_dwell_steps: 30,
            lanes: HashMap::new(),
            stations: Vec::new(),
            vehicles: Vec::new(),
            refused_stops: HashSet::new(),
            stop_log: Vec::new(),
            closed: false,
        }
    }

    pub fn with_lane(mut self, id: &str, length: f64) -> Self {
        self.lanes.insert(id.to_string(), length);
        self
    }

    pub fn with_station(mut self, id: &str, lane: &str, start_pos: f64, end_pos: f64) -> Self {
        self.stations.push((
            id.to_string(),
            StationGeometry {
                lane: lane.to_string(),
                start_pos,
                end_pos,
            },
        ));
        self
    }

    pub fn with_vehicle(mut self, vehicle: ScriptedVehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    /// Steps a vehicle stays at a charging stop.
    pub fn with_charge_dwell(mut self, steps: usize) -> Self {
        self.charge_dwell_steps = steps;
        self
    }

    /// Makes every charging-stop command for `vehicle` fail.
    pub fn refusing_stops_for(mut self, vehicle: &str) -> Self {
        self.refused_stops.insert(vehicle.to_string());
        self
    }

    /// Charging-stop commands accepted so far, as `(vehicle, station)`.
    pub fn stop_log(&self) -> &[(String, String)] {
        &self.stop_log
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    fn lane_length(&self, lane: &str) -> f64 {
        self.lanes.get(lane).copied().unwrap_or(f64::INFINITY)
    }

    fn station(&self, id: &str) -> Option<&StationGeometry> {
        self.stations.iter().find(|(sid, _)| sid == id).map(|(_, g)| g)
    }

    fn active(&self, id: &str) -> Result<&ScriptedVehicle, SimError> {
        self.vehicles
            .iter()
            .find(|v| v.id == id && v.is_active())
            .ok_or_else(|| SimError::UnknownObject {
                kind: "vehicle",
                id: id.to_string(),
            })
    }

    fn advance(&mut self, index: usize) {
        let dwell = self.charge_dwell_steps;
        let stop_start = self.vehicles[index]
            .stop
            .as_deref()
            .and_then(|s| self.station(s))
            .map(|g| g.start_pos);
        let lane_length = self.lane_length(&self.vehicles[index].lane);
        let step = self.steps;
        let dt = self.step_length_s;
        let v = &mut self.vehicles[index];

        match v.phase {
            Phase::Pending => {
                if step >= v.depart_step {
                    v.phase = Phase::Driving;
                }
            }
            Phase::Driving => {
                let next = v.position + v.speed * dt;
                match stop_start {
                    Some(start) if next >= start => {
                        v.position = start;
                        v.speed = 0.0;
                        v.stop = None;
                        v.phase = Phase::Charging { remaining: dwell };
                    }
                    _ => v.position = next,
                }
                if v.position > lane_length {
                    v.phase = Phase::Arrived;
                }
            }
            Phase::Charging { remaining } => {
                if remaining <= 1 {
                    v.speed = v.cruise_speed;
                    v.phase = Phase::Driving;
                } else {
                    v.phase = Phase::Charging {
                        remaining: remaining - 1,
                    };
                }
            }
            Phase::Arrived => {}
        }
    }
}

impl TrafficSimulator for ScriptedSimulator {
    fn step(&mut self) -> Result<(), SimError> {
        if self.closed {
            return Err(SimError::Rejected("simulation already closed".into()));
        }
        self.steps += 1;
        for i in 0..self.vehicles.len() {
            self.advance(i);
        }
        Ok(())
    }

    fn time_s(&mut self) -> Result<f64, SimError> {
        Ok(self.steps as f64 * self.step_length_s)
    }

    fn min_expected_vehicles(&mut self) -> Result<i32, SimError> {
        let n = self
            .vehicles
            .iter()
            .filter(|v| v.phase != Phase::Arrived)
            .count();
        Ok(i32::try_from(n).unwrap_or(i32::MAX))
    }

    fn charging_station_ids(&mut self) -> Result<Vec<String>, SimError> {
        Ok(self.stations.iter().map(|(id, _)| id.clone()).collect())
    }

    fn charging_station(&mut self, id: &str) -> Result<StationGeometry, SimError> {
        self.station(id).cloned().ok_or_else(|| SimError::UnknownObject {
            kind: "charging station",
            id: id.to_string(),
        })
    }

    fn lane_vehicle_ids(&mut self, lane: &str) -> Result<Vec<String>, SimError> {
        Ok(self
            .vehicles
            .iter()
            .filter(|v| v.lane == lane && v.is_active())
            .map(|v| v.id.clone())
            .collect())
    }

    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<f64, SimError> {
        self.active(vehicle).map(|v| v.position)
    }

    fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64, SimError> {
        self.active(vehicle).map(|v| v.speed)
    }

    fn vehicle_parameter(&mut self, vehicle: &str, key: &str) -> Result<String, SimError> {
        let v = self.active(vehicle)?;
        if v.unreadable_battery && key.starts_with("device.battery.") {
            return Err(SimError::Rejected(format!(
                "battery device not readable on {vehicle}"
            )));
        }
        Ok(v.params.get(key).cloned().unwrap_or_default())
    }

    fn set_charging_station_stop(
        &mut self,
        vehicle: &str,
        station: &str,
    ) -> Result<(), SimError> {
        let geometry = self
            .station(station)
            .cloned()
            .ok_or_else(|| SimError::UnknownObject {
                kind: "charging station",
                id: station.to_string(),
            })?;
        if self.refused_stops.contains(vehicle) {
            return Err(SimError::Rejected(format!(
                "{vehicle} cannot stop at {station}"
            )));
        }
        let v = self
            .vehicles
            .iter_mut()
            .find(|v| v.id == vehicle && v.phase == Phase::Driving)
            .ok_or_else(|| SimError::UnknownObject {
                kind: "vehicle",
                id: vehicle.to_string(),
            })?;
        if v.lane != geometry.lane || v.position >= geometry.start_pos {
            return Err(SimError::Rejected(format!(
                "{vehicle} is too close to stop at {station}"
            )));
        }
        v.stop = Some(station.to_string());
        self.stop_log
            .push((vehicle.to_string(), station.to_string()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), SimError> {
        self.closed = true;
        Ok(())
    }
}
