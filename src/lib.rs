//! EV charging price-control simulator on SUMO.
//!
//! Builds a grid scenario with EV-tagged routes and charging stations, then
//! drives SUMO over TraCI through a pricing, admission and accounting loop.

/// REST API over session results (requires `api` feature).
#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
/// CSV import and export.
pub mod io;
/// Scenario generation with the SUMO tool chain.
pub mod scenario;
/// Charging session, pricing, acceptance and KPI modules.
pub mod sim;
/// TraCI client and SUMO process management.
pub mod traci;
