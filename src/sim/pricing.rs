//! Per-step price determination: strategy selection, tier discretization,
//! and charge-price smoothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::io::series::RecommendationSeries;

/// Lowest price the charge-price filter will track ($/kWh).
pub const PRICE_FLOOR: f64 = 0.20;
/// Highest price the charge-price filter will track ($/kWh).
pub const PRICE_CEILING: f64 = 0.40;
/// Weight of the newest raw price in the charge-price filter.
pub const SMOOTHING_WEIGHT: f64 = 0.05;

/// Recommendation rows advance once every this many steps under `ppo_csv`.
const STEPS_PER_RECOMMENDATION: usize = 10;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Pricing policy applied by a simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum PricingStrategy {
    /// Constant base price.
    #[serde(rename = "flat")]
    #[value(name = "flat")]
    Flat,
    /// Fixed daily time-of-use schedule.
    #[serde(rename = "tou")]
    #[value(name = "tou")]
    TimeOfUse,
    /// Recommended action series indexed by step.
    #[serde(rename = "ppo_csv")]
    #[value(name = "ppo_csv")]
    RecommendedByStep,
    /// Recommended action series indexed by elapsed time / period.
    #[serde(rename = "ppo_time")]
    #[value(name = "ppo_time")]
    RecommendedByPeriod,
}

impl PricingStrategy {
    /// Name used in config files, CLI arguments and KPI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::TimeOfUse => "tou",
            Self::RecommendedByStep => "ppo_csv",
            Self::RecommendedByPeriod => "ppo_time",
        }
    }

    /// Returns `true` for the strategies that read a recommendation series.
    pub fn uses_recommendations(self) -> bool {
        matches!(self, Self::RecommendedByStep | Self::RecommendedByPeriod)
    }
}

impl fmt::Display for PricingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Discrete price tier used by the acceptance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTier {
    OffPeak,
    Standard,
    Peak,
}

impl PriceTier {
    /// Maps a raw strategy price onto a tier: `>= 0.35` is peak, `<= 0.25`
    /// is off-peak, anything else is standard.
    pub fn from_raw(raw: f64) -> Self {
        if raw >= 0.35 {
            Self::Peak
        } else if raw <= 0.25 {
            Self::OffPeak
        } else {
            Self::Standard
        }
    }

    /// Decision price of this tier ($/kWh).
    pub fn price(self) -> f64 {
        match self {
            Self::OffPeak => 0.20,
            Self::Standard => 0.30,
            Self::Peak => 0.40,
        }
    }
}

/// Time-of-use schedule: peak 0.40 (7–10h, 17–20h), off-peak 0.20 (22–6h),
/// 0.30 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct TouSchedule {
    /// Seconds added to simulation time before taking the hour of day.
    pub offset_s: f64,
}

impl TouSchedule {
    /// Human-readable schedule summary written to the KPI report.
    pub const DESCRIPTION: &'static str =
        "peak 0.40 (7-10,17-20); off-peak 0.20 (22-6); else 0.30";

    /// Builds a schedule whose simulation time zero maps to `hour:minute`.
    pub fn starting_at(hour: u32, minute: u32) -> Self {
        Self {
            offset_s: f64::from(hour) * SECONDS_PER_HOUR + f64::from(minute) * 60.0,
        }
    }

    /// Hour of day (0–23) at simulation time `time_s`.
    pub fn hour_of_day(&self, time_s: f64) -> u32 {
        let hours = ((time_s + self.offset_s) / SECONDS_PER_HOUR).floor() as i64;
        hours.rem_euclid(24) as u32
    }

    /// Tariff at simulation time `time_s`.
    pub fn price_at(&self, time_s: f64) -> f64 {
        let h = self.hour_of_day(time_s);
        if (7..10).contains(&h) || (17..20).contains(&h) {
            0.40
        } else if h >= 22 || h < 6 {
            0.20
        } else {
            0.30
        }
    }
}

/// Exponential filter that turns raw strategy prices into a billing price.
#[derive(Debug, Clone, Copy)]
pub struct ChargePriceFilter {
    value: f64,
}

impl ChargePriceFilter {
    pub fn new(initial: f64) -> Self {
        Self { value: initial }
    }

    /// Feeds one raw price and returns the updated charge price.
    pub fn update(&mut self, raw: f64) -> f64 {
        let capped = raw.clamp(PRICE_FLOOR, PRICE_CEILING);
        self.value = (1.0 - SMOOTHING_WEIGHT) * self.value + SMOOTHING_WEIGHT * capped;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Prices in effect for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSignal {
    /// Tier driving acceptance decisions.
    pub tier: PriceTier,
    /// Smoothed price used for billing ($/kWh).
    pub charge_price: f64,
}

impl PriceSignal {
    pub fn decision_price(&self) -> f64 {
        self.tier.price()
    }
}

/// Strategy parameters needed to compute raw prices.
#[derive(Debug, Clone)]
pub struct PricingParams {
    pub strategy: PricingStrategy,
    /// Base price ($/kWh).
    pub base: f64,
    /// Price change per unit of recommended action ($/kWh).
    pub spread: f64,
    /// Seconds per recommendation row under `ppo_time`.
    pub period_s: f64,
    pub tou: TouSchedule,
}

/// Stateful pricer owning the strategy, the recommendation series and the
/// charge-price filter for one session.
#[derive(Debug, Clone)]
pub struct Pricer {
    params: PricingParams,
    series: RecommendationSeries,
    filter: ChargePriceFilter,
}

impl Pricer {
    /// Creates a pricer whose charge price starts at the base price.
    pub fn new(params: PricingParams, series: RecommendationSeries) -> Self {
        let filter = ChargePriceFilter::new(params.base);
        Self {
            params,
            series,
            filter,
        }
    }

    pub fn params(&self) -> &PricingParams {
        &self.params
    }

    /// Raw (unsmoothed) strategy price at `time_s` / `step`.
    pub fn raw_price(&self, time_s: f64, step: usize) -> f64 {
        let p = &self.params;
        match p.strategy {
            PricingStrategy::Flat => p.base,
            PricingStrategy::TimeOfUse => p.tou.price_at(time_s),
            PricingStrategy::RecommendedByStep => {
                self.recommended(self.series.index_by_step(step, STEPS_PER_RECOMMENDATION))
            }
            PricingStrategy::RecommendedByPeriod => {
                self.recommended(self.series.index_by_period(time_s, p.period_s))
            }
        }
    }

    fn recommended(&self, index: Option<usize>) -> f64 {
        match index.and_then(|i| self.series.action(i)) {
            Some(action) => self.params.base + self.params.spread * action,
            None => self.params.base,
        }
    }

    /// Computes this step's prices and advances the charge-price filter.
    pub fn next_signal(&mut self, time_s: f64, step: usize) -> PriceSignal {
        let raw = self.raw_price(time_s, step);
        PriceSignal {
            tier: PriceTier::from_raw(raw),
            charge_price: self.filter.update(raw),
        }
    }
}
