//! KPI computation from session aggregates.

use std::fmt;

use serde::Serialize;

use super::pricing::PricingParams;
use super::types::{ChargingStation, StationTally};

/// Guard against division by zero in the peak-to-average ratio.
const PAR_EPSILON: f64 = 1e-9;

/// Per-station KPIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationKpi {
    pub station_id: String,
    /// Share of steps in which the station was occupied (0.0 to 1.0).
    pub utilization_rate: f64,
    /// Revenue ($).
    pub revenue: f64,
}

/// Aggregate key performance indicators of one session.
#[derive(Debug, Clone, Serialize)]
pub struct KpiReport {
    /// Strategy name (`flat`, `tou`, `ppo_csv`, `ppo_time`).
    pub strategy: String,
    /// Strategy parameters as `(name, value)` pairs, in report order.
    pub parameters: Vec<(String, String)>,
    pub stations: Vec<StationKpi>,
    /// Sum of station revenues ($).
    pub total_revenue: f64,
    /// Peak-to-average ratio of total charging power.
    pub peak_to_average: f64,
    /// Steps used as utilization denominator (at least 1).
    pub total_steps: usize,
}

impl KpiReport {
    /// Computes all KPIs from the session aggregates.
    ///
    /// # Arguments
    ///
    /// * `pricing` - Pricing parameters of the session
    /// * `cooldown_s` - Station cooldown used by the session
    /// * `stations` - Stations in session order
    /// * `tallies` - Per-station tallies, parallel to `stations`
    /// * `power_samples` - Total charging power per step (kW)
    pub fn from_session(
        pricing: &PricingParams,
        cooldown_s: f64,
        stations: &[ChargingStation],
        tallies: &[StationTally],
        power_samples: &[f64],
    ) -> Self {
        let total_steps = power_samples.len().max(1);
        let peak_to_average = peak_to_average(power_samples);

        let stations: Vec<StationKpi> = stations
            .iter()
            .zip(tallies)
            .map(|(s, t)| StationKpi {
                station_id: s.id.clone(),
                utilization_rate: t.occupied_steps as f64 / total_steps as f64,
                revenue: t.revenue,
            })
            .collect();
        let total_revenue = stations.iter().map(|s| s.revenue).sum();

        Self {
            strategy: pricing.strategy.name().to_string(),
            parameters: strategy_parameters(pricing, cooldown_s),
            stations,
            total_revenue,
            peak_to_average,
            total_steps,
        }
    }
}

/// `max / (mean + eps)` of the samples, 0 when there are none.
pub fn peak_to_average(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let peak = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    peak / (mean + PAR_EPSILON)
}

fn strategy_parameters(pricing: &PricingParams, cooldown_s: f64) -> Vec<(String, String)> {
    use super::pricing::{PricingStrategy, TouSchedule};

    let mut params = Vec::new();
    match pricing.strategy {
        PricingStrategy::Flat => {}
        PricingStrategy::TimeOfUse => {
            let start_h = (pricing.tou.offset_s / 3600.0).floor();
            let start_min = ((pricing.tou.offset_s - start_h * 3600.0) / 60.0).floor();
            params.push(("tou_schedule".into(), TouSchedule::DESCRIPTION.into()));
            params.push(("start_h".into(), format!("{start_h}")));
            params.push(("start_min".into(), format!("{start_min}")));
        }
        PricingStrategy::RecommendedByStep | PricingStrategy::RecommendedByPeriod => {
            params.push(("base_$/kWh".into(), format!("{:?}", pricing.base)));
            params.push(("spread_$/kWh".into(), format!("{:?}", pricing.spread)));
            params.push(("period_s".into(), format!("{:?}", pricing.period_s)));
        }
    }
    params.push(("cooldown_s".into(), format!("{cooldown_s:?}")));
    params
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ({}) ---", self.strategy)?;
        for s in &self.stations {
            writeln!(
                f,
                "{:<12} utilization {:>6.2}%  revenue ${:.2}",
                s.station_id,
                s.utilization_rate * 100.0,
                s.revenue
            )?;
        }
        writeln!(f, "Total revenue:         ${:.2}", self.total_revenue)?;
        writeln!(f, "Peak-to-average power: {:.4}", self.peak_to_average)?;
        write!(f, "Total steps:           {}", self.total_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pricing::{PricingStrategy, TouSchedule};

    fn pricing(strategy: PricingStrategy) -> PricingParams {
        PricingParams {
            strategy,
            base: 0.30,
            spread: 0.30,
            period_s: 120.0,
            tou: TouSchedule::starting_at(21, 30),
        }
    }

    fn station(id: &str) -> ChargingStation {
        ChargingStation {
            id: id.into(),
            lane: "L".into(),
            start_pos: 10.0,
            end_pos: 60.0,
            power_kw: 50.0,
        }
    }

    #[test]
    fn par_of_flat_profile_is_one() {
        let par = peak_to_average(&[50.0, 50.0, 50.0]);
        assert!((par - 1.0).abs() < 1e-6);
    }

    #[test]
    fn par_of_spiky_profile() {
        // peak 100, mean 25
        let par = peak_to_average(&[0.0, 0.0, 0.0, 100.0]);
        assert!((par - 4.0).abs() < 1e-6);
    }

    #[test]
    fn par_of_empty_and_idle() {
        assert_eq!(peak_to_average(&[]), 0.0);
        assert_eq!(peak_to_average(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn utilization_and_revenue() {
        let stations = vec![station("CS_0"), station("CS_1")];
        let tallies = vec![
            StationTally {
                occupied_steps: 2,
                revenue: 1.5,
            },
            StationTally {
                occupied_steps: 0,
                revenue: 0.0,
            },
        ];
        let kpi = KpiReport::from_session(
            &pricing(PricingStrategy::Flat),
            90.0,
            &stations,
            &tallies,
            &[50.0, 0.0, 50.0, 0.0],
        );
        assert_eq!(kpi.total_steps, 4);
        assert_eq!(kpi.stations[0].utilization_rate, 0.5);
        assert_eq!(kpi.stations[1].utilization_rate, 0.0);
        assert_eq!(kpi.total_revenue, 1.5);
        assert_eq!(kpi.parameters, vec![("cooldown_s".to_string(), "90.0".to_string())]);
    }

    #[test]
    fn zero_steps_uses_unit_denominator() {
        let kpi = KpiReport::from_session(
            &pricing(PricingStrategy::Flat),
            90.0,
            &[station("CS_0")],
            &[StationTally::default()],
            &[],
        );
        assert_eq!(kpi.total_steps, 1);
        assert_eq!(kpi.peak_to_average, 0.0);
    }

    #[test]
    fn tou_parameters_include_start_time() {
        let kpi = KpiReport::from_session(
            &pricing(PricingStrategy::TimeOfUse),
            60.0,
            &[],
            &[],
            &[],
        );
        let names: Vec<&str> = kpi.parameters.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["tou_schedule", "start_h", "start_min", "cooldown_s"]);
        assert_eq!(kpi.parameters[1].1, "21");
        assert_eq!(kpi.parameters[2].1, "30");
    }

    #[test]
    fn display_does_not_panic() {
        let kpi = KpiReport::from_session(
            &pricing(PricingStrategy::RecommendedByStep),
            90.0,
            &[station("CS_0")],
            &[StationTally::default()],
            &[0.0],
        );
        assert!(format!("{kpi}").contains("ppo_csv"));
    }

    #[test]
    fn float_parameters_keep_a_decimal_point() {
        let kpi = KpiReport::from_session(
            &pricing(PricingStrategy::RecommendedByPeriod),
            90.0,
            &[],
            &[],
            &[],
        );
        let values: Vec<&str> = kpi.parameters.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["0.3", "0.3", "120.0", "90.0"]);
    }
}
