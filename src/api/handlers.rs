//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, KpiResponse, PriceQuery, PriceRecord};

/// `GET /kpi` → 200 + `KpiResponse` JSON
pub async fn get_kpi(State(state): State<Arc<AppState>>) -> Json<KpiResponse> {
    Json(KpiResponse {
        config: state.config.clone(),
        kpi: state.kpi.clone(),
        assigned_vehicles: state.assigned.len(),
    })
}

/// Returns price samples, optionally filtered by step range.
///
/// `GET /prices` → 200 + `Vec<PriceRecord>` JSON
/// `GET /prices?from=N&to=M` → filtered range (inclusive)
/// `GET /prices?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<PriceRecord> = state
        .prices
        .iter()
        .filter(|p| p.step >= from && p.step <= to)
        .map(PriceRecord::from)
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::sim::kpi::{KpiReport, StationKpi};
    use crate::sim::types::PriceSample;

    fn make_test_state() -> Arc<AppState> {
        let prices = (0..24)
            .map(|step| PriceSample {
                step,
                time_s: (step + 1) as f64,
                decision_price: 0.30,
                charge_price: 0.30,
            })
            .collect();
        let kpi = KpiReport {
            strategy: "flat".into(),
            parameters: vec![("cooldown_s".into(), "90.0".into())],
            stations: vec![StationKpi {
                station_id: "CS_0".into(),
                utilization_rate: 0.5,
                revenue: 0.1,
            }],
            total_revenue: 0.1,
            peak_to_average: 2.0,
            total_steps: 24,
        };
        Arc::new(AppState {
            config: ScenarioConfig::default(),
            kpi,
            prices,
            assigned: vec!["veh0".into(), "veh7".into()],
        })
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn kpi_returns_200() {
        let (status, json) = get("/kpi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kpi"]["strategy"], "flat");
        assert_eq!(json["assigned_vehicles"], 2);
        assert_eq!(json["config"]["simulation"]["strategy"], "flat");
    }

    #[tokio::test]
    async fn prices_returns_all_steps() {
        let (status, json) = get("/prices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn prices_range_query() {
        let (status, json) = get("/prices?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6); // steps 5..=10
        assert_eq!(rows[0]["step"], 5);
        assert_eq!(rows[5]["step"], 10);
    }

    #[tokio::test]
    async fn prices_invalid_range_returns_400() {
        let (status, json) = get("/prices?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
