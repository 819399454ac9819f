//! API response and query types.
//!
//! Price field names follow the price CSV columns.

use serde::{Deserialize, Serialize};

use crate::config::ScenarioConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::PriceSample;

/// Run summary: configuration, KPIs and how many vehicles were assigned.
#[derive(Debug, Serialize)]
pub struct KpiResponse {
    pub config: ScenarioConfig,
    pub kpi: KpiReport,
    pub assigned_vehicles: usize,
}

/// One price sample.
#[derive(Debug, Serialize)]
pub struct PriceRecord {
    pub step: usize,
    pub time_s: f64,
    #[serde(rename = "decision_price_$per_kWh")]
    pub decision_price: f64,
    #[serde(rename = "charge_price_$per_kWh")]
    pub charge_price: f64,
}

impl From<&PriceSample> for PriceRecord {
    fn from(p: &PriceSample) -> Self {
        Self {
            step: p.step,
            time_s: p.time_s,
            decision_price: p.decision_price,
            charge_price: p.charge_price,
        }
    }
}

/// Optional step range for the prices endpoint.
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// First step (inclusive).
    pub from: Option<usize>,
    /// Last step (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
