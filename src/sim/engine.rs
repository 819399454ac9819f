//! Charging session that drives a traffic simulator through the pricing,
//! admission and accounting loop.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::acceptance::{AcceptancePolicy, WaitEstimator};
use super::clock::StepClock;
use super::kpi::KpiReport;
use super::pricing::{PriceSignal, Pricer};
use super::simulator::{SimError, TrafficSimulator};
use super::types::{ChargingStation, PriceSample, SessionParams, StationTally, StepOutcome};
use super::vehicle::read_soc;
use crate::io::series::RecommendationSeries;

/// Initial cooldown stamp so that every station may accept right away.
const NEVER_ACCEPTED_S: f64 = -1e9;

/// Speed is only queried for vehicles inside the span.
fn stationary_in_span<S: TrafficSimulator>(
    sim: &mut S,
    station: &ChargingStation,
    vehicle: &str,
    lane_pos: f64,
) -> Result<bool, SimError> {
    if !station.spans(lane_pos) {
        return Ok(false);
    }
    Ok(station.occupied_by(lane_pos, sim.vehicle_speed(vehicle)?))
}

/// One simulation run: owns the simulator handle and all per-run state.
///
/// Generic over `S: TrafficSimulator` for static dispatch, so the same loop
/// runs against SUMO or the scripted simulator.
pub struct Session<S: TrafficSimulator> {
    sim: S,
    stations: Vec<ChargingStation>,
    pricer: Pricer,
    policy: AcceptancePolicy,
    wait: WaitEstimator,
    soc_threshold: f64,
    cooldown_s: f64,
    clock: StepClock,
    rng: StdRng,
    assigned: HashSet<String>,
    assignment_order: Vec<String>,
    last_accept_s: Vec<f64>,
    tallies: Vec<StationTally>,
    power_samples: Vec<f64>,
    prices: Vec<PriceSample>,
}

/// Everything a finished session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub kpi: KpiReport,
    pub prices: Vec<PriceSample>,
    /// Vehicles sent to a station, in acceptance order.
    pub assigned: Vec<String>,
}

impl<S: TrafficSimulator> Session<S> {
    /// Creates a session and reads the charging stations from `sim`.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the station metadata cannot be queried.
    pub fn new(
        mut sim: S,
        params: SessionParams,
        series: RecommendationSeries,
    ) -> Result<Self, SimError> {
        let mut stations = Vec::new();
        for id in sim.charging_station_ids()? {
            let geometry = sim.charging_station(&id)?;
            stations.push(ChargingStation {
                id,
                lane: geometry.lane,
                start_pos: geometry.start_pos,
                end_pos: geometry.end_pos,
                power_kw: params.station_power_kw,
            });
        }
        info!(
            stations = stations.len(),
            strategy = %params.pricing.strategy,
            "session ready"
        );

        let n = stations.len();
        Ok(Self {
            sim,
            stations,
            pricer: Pricer::new(params.pricing, series),
            policy: params.acceptance,
            wait: params.wait,
            soc_threshold: params.soc_threshold,
            cooldown_s: params.cooldown_s,
            clock: StepClock::new(params.max_steps),
            rng: StdRng::seed_from_u64(params.seed),
            assigned: HashSet::new(),
            assignment_order: Vec::new(),
            last_accept_s: vec![NEVER_ACCEPTED_S; n],
            tallies: vec![StationTally::default(); n],
            power_samples: Vec::new(),
            prices: Vec::new(),
        })
    }

    pub fn stations(&self) -> &[ChargingStation] {
        &self.stations
    }

    pub fn tallies(&self) -> &[StationTally] {
        &self.tallies
    }

    /// Vehicles sent to a station so far, in acceptance order.
    pub fn assigned(&self) -> &[String] {
        &self.assignment_order
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// Executes one simulation step.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the simulator cannot advance or vehicle
    /// positions cannot be queried.
    pub fn step(&mut self, step: usize) -> Result<StepOutcome, SimError> {
        // 1. Advance the simulator
        self.sim.step()?;
        let time_s = self.sim.time_s()?;

        // 2. Prices for this step
        let signal = self.pricer.next_signal(time_s, step);
        let prices = PriceSample {
            step,
            time_s,
            decision_price: signal.decision_price(),
            charge_price: signal.charge_price,
        };
        self.prices.push(prices);

        // 3. Admission
        let mut accepted = Vec::new();
        for idx in 0..self.stations.len() {
            self.admit(idx, time_s, signal, &mut accepted)?;
        }

        // 4. Accounting
        let total_power_kw = self.account(signal.charge_price)?;
        self.power_samples.push(total_power_kw);

        Ok(StepOutcome {
            prices,
            accepted,
            total_power_kw,
        })
    }

    fn admit(
        &mut self,
        idx: usize,
        time_s: f64,
        signal: PriceSignal,
        accepted: &mut Vec<(String, String)>,
    ) -> Result<(), SimError> {
        let station = &self.stations[idx];
        let vehicles = self.sim.lane_vehicle_ids(&station.lane)?;

        let mut positions = Vec::with_capacity(vehicles.len());
        let mut queue_len = 0;
        for vid in &vehicles {
            let pos = self.sim.vehicle_lane_position(vid)?;
            if stationary_in_span(&mut self.sim, station, vid, pos)? {
                queue_len += 1;
            }
            positions.push(pos);
        }

        for (vid, pos) in vehicles.iter().zip(positions) {
            if self.assigned.contains(vid) || !station.is_approached_from(pos) {
                continue;
            }
            if time_s - self.last_accept_s[idx] < self.cooldown_s {
                continue;
            }
            let soc = read_soc(&mut self.sim, vid, self.wait.capacity_kwh).min(1.0);
            if soc > self.soc_threshold {
                continue;
            }
            let wait_h = self.wait.wait_hours(queue_len, soc, station.power_kw);
            let p = self.policy.probability(soc, signal.tier, wait_h);
            let draw: f64 = self.rng.random();
            if draw >= p {
                continue;
            }

            match self.sim.set_charging_station_stop(vid, &station.id) {
                Ok(()) => {
                    debug!(vehicle = %vid, station = %station.id, soc, wait_h, p, "charging stop accepted");
                    self.assigned.insert(vid.clone());
                    self.assignment_order.push(vid.clone());
                    self.last_accept_s[idx] = time_s;
                    queue_len += 1;
                    accepted.push((vid.clone(), station.id.clone()));
                }
                Err(e) => {
                    debug!(vehicle = %vid, station = %station.id, error = %e, "charging stop not issued");
                }
            }
        }
        Ok(())
    }

    /// Bills the first stationary vehicle inside each station span and
    /// returns the step's total charging power. A vehicle billed at one
    /// station is not billed again at another station in the same step.
    fn account(&mut self, charge_price: f64) -> Result<f64, SimError> {
        let mut billed: HashSet<String> = HashSet::new();
        let mut total_kw = 0.0;
        for (station, tally) in self.stations.iter().zip(self.tallies.iter_mut()) {
            for vid in self.sim.lane_vehicle_ids(&station.lane)? {
                if billed.contains(&vid) {
                    continue;
                }
                let pos = self.sim.vehicle_lane_position(&vid)?;
                if !stationary_in_span(&mut self.sim, station, &vid, pos)? {
                    continue;
                }
                tally.occupied_steps += 1;
                tally.revenue += station.power_kw / 3600.0 * charge_price;
                total_kw += station.power_kw;
                billed.insert(vid);
                break;
            }
        }
        Ok(total_kw)
    }

    /// Runs until the simulator has no more expected vehicles or the step
    /// cap is reached.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if any simulator call fails.
    pub fn run(&mut self) -> Result<Vec<StepOutcome>, SimError> {
        let mut outcomes = Vec::new();
        while self.sim.min_expected_vehicles()? > 0 {
            let Some(step) = self.clock.tick() else {
                break;
            };
            outcomes.push(self.step(step)?);
        }
        info!(
            steps = outcomes.len(),
            assigned = self.assignment_order.len(),
            "simulation finished"
        );
        Ok(outcomes)
    }

    /// Computes the KPI report for the steps run so far.
    pub fn kpi(&self) -> KpiReport {
        KpiReport::from_session(
            self.pricer.params(),
            self.cooldown_s,
            &self.stations,
            &self.tallies,
            &self.power_samples,
        )
    }

    /// Closes the simulator and returns the session results.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the simulator cannot be closed.
    pub fn finish(mut self) -> Result<SessionReport, SimError> {
        self.sim.close()?;
        Ok(SessionReport {
            kpi: self.kpi(),
            prices: self.prices,
            assigned: self.assignment_order,
        })
    }
}
