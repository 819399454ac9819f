//! REST API over the results of a finished session.
//!
//! Provides two GET endpoints:
//! - `/kpi`: configuration, KPI report and assignment count
//! - `/prices`: per-step price samples with optional step range filtering

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::PriceSample;

/// Immutable application state shared across all request handlers.
///
/// Built once after the session finishes and wrapped in `Arc`; all data is
/// read-only.
pub struct AppState {
    /// Configuration the session ran with.
    pub config: ScenarioConfig,
    pub kpi: KpiReport,
    /// Price samples in step order.
    pub prices: Vec<PriceSample>,
    /// Vehicles sent to a station, in acceptance order.
    pub assigned: Vec<String>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/kpi", get(handlers::get_kpi))
        .route("/prices", get(handlers::get_prices))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
