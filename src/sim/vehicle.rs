//! State-of-charge derivation from simulator battery parameters.

use tracing::debug;

use super::simulator::{SimError, TrafficSimulator};

pub const PARAM_ACTUAL_CHARGE: &str = "device.battery.actualBatteryCharge";
pub const PARAM_ACTUAL_CAPACITY: &str = "device.battery.actualBatteryCapacity";
pub const PARAM_SOC: &str = "device.battery.soc";

/// SOC ratio in `[0, 1]` from an explicit charge/capacity pair (Wh).
///
/// `None` when either value is missing, not a number, or the capacity is
/// not positive.
pub fn soc_from_charge(charge: &str, capacity: &str) -> Option<f64> {
    let charge = parse(charge)?;
    let capacity = parse(capacity)?;
    (capacity > 0.0).then(|| (charge / capacity).clamp(0.0, 1.0))
}

/// SOC ratio from a raw `soc` parameter.
///
/// Values up to 1.0 are taken as a ratio; larger values are read as Wh
/// against `capacity_kwh`.
pub fn soc_from_raw(raw: &str, capacity_kwh: f64) -> Option<f64> {
    let v = parse(raw)?;
    if v <= 1.0 {
        return Some(v.clamp(0.0, 1.0));
    }
    let capacity_wh = capacity_kwh * 1000.0;
    (capacity_wh > 0.0).then(|| (v / capacity_wh).clamp(0.0, 1.0))
}

fn parse(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads a vehicle's SOC ratio, degrading to 0.0 (needs charge) when the
/// battery parameters are missing or cannot be read.
pub fn read_soc<S: TrafficSimulator + ?Sized>(sim: &mut S, vehicle: &str, capacity_kwh: f64) -> f64 {
    match try_read_soc(sim, vehicle, capacity_kwh) {
        Ok(Some(soc)) => soc,
        Ok(None) => {
            debug!(vehicle, "no battery parameters, assuming empty battery");
            0.0
        }
        Err(e) => {
            debug!(vehicle, error = %e, "battery read failed, assuming empty battery");
            0.0
        }
    }
}

fn try_read_soc<S: TrafficSimulator + ?Sized>(
    sim: &mut S,
    vehicle: &str,
    capacity_kwh: f64,
) -> Result<Option<f64>, SimError> {
    let from_pair = match (
        sim.vehicle_parameter(vehicle, PARAM_ACTUAL_CHARGE),
        sim.vehicle_parameter(vehicle, PARAM_ACTUAL_CAPACITY),
    ) {
        (Ok(charge), Ok(capacity)) => soc_from_charge(&charge, &capacity),
        _ => None,
    };
    if from_pair.is_some() {
        return Ok(from_pair);
    }
    let raw = sim.vehicle_parameter(vehicle, PARAM_SOC)?;
    Ok(soc_from_raw(&raw, capacity_kwh))
}
