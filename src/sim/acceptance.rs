//! Wait-time estimation and the logistic charging-acceptance model.

use serde::{Deserialize, Serialize};

use super::pricing::{PriceTier, PricingStrategy};

/// Shortest per-vehicle service time (hours).
pub const MIN_SERVICE_HOURS: f64 = 10.0 / 60.0;
/// Longest per-vehicle service time (hours).
pub const MAX_SERVICE_HOURS: f64 = 45.0 / 60.0;
/// Estimated waits above this many hours make drivers balk.
pub const BALK_WAIT_HOURS: f64 = 0.5;
/// Above this SOC a driver defers charging during time-of-use peak.
pub const PEAK_DEFERRAL_SOC: f64 = 0.15;

/// Reference price for the logistic price term ($/kWh).
const PRICE_REF: f64 = 0.30;
/// Normalisation span for the logistic price term ($/kWh).
const PRICE_SPAN: f64 = 0.10;
/// Logit bound applied before the sigmoid.
const LOGIT_LIMIT: f64 = 20.0;

/// Deterministic queue-wait approximation for a charging station.
#[derive(Debug, Clone, Copy)]
pub struct WaitEstimator {
    /// Vehicle battery capacity (kWh).
    pub capacity_kwh: f64,
    /// SOC each queued vehicle charges up to.
    pub target_soc: f64,
    pub min_service_h: f64,
    pub max_service_h: f64,
}

impl WaitEstimator {
    pub fn new(capacity_kwh: f64, target_soc: f64) -> Self {
        Self {
            capacity_kwh,
            target_soc,
            min_service_h: MIN_SERVICE_HOURS,
            max_service_h: MAX_SERVICE_HOURS,
        }
    }

    /// Service time for one vehicle at `soc` on a `power_kw` charger (hours).
    pub fn service_hours(&self, soc: f64, power_kw: f64) -> f64 {
        let need_kwh = (self.target_soc - soc).max(0.0) * self.capacity_kwh;
        (need_kwh / power_kw.max(1e-6)).clamp(self.min_service_h, self.max_service_h)
    }

    /// Estimated wait behind `queue_len` vehicles (hours).
    pub fn wait_hours(&self, queue_len: usize, soc: f64, power_kw: f64) -> f64 {
        queue_len as f64 * self.service_hours(soc, power_kw)
    }
}

/// Coefficients of the logistic acceptance model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogitCoefficients {
    /// Intercept.
    pub beta0: f64,
    /// Weight on SOC deficit `1 - soc`.
    pub beta1: f64,
    /// Weight on normalised price deviation.
    pub beta2: f64,
    /// Weight on estimated wait (hours).
    pub beta3: f64,
}

impl Default for LogitCoefficients {
    fn default() -> Self {
        Self {
            beta0: -1.8,
            beta1: 3.8,
            beta2: -7.0,
            beta3: -6.0,
        }
    }
}

impl LogitCoefficients {
    /// Base acceptance probability before policy overlays.
    pub fn probability(&self, soc: f64, price: f64, wait_h: f64) -> f64 {
        let price_norm = (price - PRICE_REF) / PRICE_SPAN;
        let z = self.beta0
            + self.beta1 * (1.0 - soc)
            + self.beta2 * price_norm
            + self.beta3 * wait_h;
        sigmoid(z.clamp(-LOGIT_LIMIT, LOGIT_LIMIT))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl PriceTier {
    /// Elasticity multiplier applied on top of the logistic term.
    pub fn acceptance_multiplier(self) -> f64 {
        match self {
            Self::OffPeak => 1.10,
            Self::Standard => 0.45,
            Self::Peak => 0.01,
        }
    }
}

/// Logistic model plus the pricing-policy overlays.
#[derive(Debug, Clone, Copy)]
pub struct AcceptancePolicy {
    pub coefficients: LogitCoefficients,
    pub strategy: PricingStrategy,
}

impl AcceptancePolicy {
    /// Final probability in `[0, 1]` that a driver accepts a charging stop.
    pub fn probability(&self, soc: f64, tier: PriceTier, wait_h: f64) -> f64 {
        let mut p = self.coefficients.probability(soc, tier.price(), wait_h);

        if self.strategy == PricingStrategy::TimeOfUse
            && tier == PriceTier::Peak
            && soc > PEAK_DEFERRAL_SOC
        {
            p = 0.0;
        }

        p *= tier.acceptance_multiplier();

        if wait_h > BALK_WAIT_HOURS {
            p = 0.0;
        }

        p.clamp(0.0, 1.0)
    }
}
