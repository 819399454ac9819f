//! Integration tests for a flat-price session on a single station.

mod common;

use ev_price_sim::io::series::RecommendationSeries;
use ev_price_sim::sim::pricing::PricingStrategy;
use ev_price_sim::sim::scripted::ScriptedVehicle;

fn flat_run() -> common::Run {
    let sim = common::single_station().with_vehicle(common::slow_ev("veh0"));
    common::run(
        sim,
        common::params(PricingStrategy::Flat),
        RecommendationSeries::empty(),
    )
}

#[test]
fn flat_prices_are_constant() {
    let run = flat_run();
    assert!(!run.report.prices.is_empty());
    for p in &run.report.prices {
        assert_eq!(p.decision_price, 0.30);
        assert!((p.charge_price - 0.30).abs() < 1e-9);
    }
}

#[test]
fn stations_are_read_with_configured_power() {
    let run = flat_run();
    assert_eq!(run.stations.len(), 1);
    let station = &run.stations[0];
    assert_eq!(station.id, "CS_0");
    assert_eq!(station.lane, common::LANE);
    assert_eq!((station.start_pos, station.end_pos), (50.0, 90.0));
    assert_eq!(station.power_kw, 50.0);
}

#[test]
fn price_samples_follow_simulation_time() {
    let run = flat_run();
    for (i, p) in run.report.prices.iter().enumerate() {
        assert_eq!(p.step, i);
        assert_eq!(p.time_s, (i + 1) as f64);
    }
}

#[test]
fn low_soc_vehicle_is_sent_to_the_station_and_billed() {
    let run = flat_run();
    assert_eq!(run.report.assigned, vec!["veh0".to_string()]);
    assert_eq!(run.stop_log, vec![("veh0".to_string(), "CS_0".to_string())]);

    let occupied = run.tallies[0].occupied_steps;
    assert!(occupied > 0);
    let expected = occupied as f64 * 50.0 / 3600.0 * 0.30;
    assert!((run.tallies[0].revenue - expected).abs() < 1e-9);
    assert!((run.report.kpi.total_revenue - expected).abs() < 1e-9);
}

#[test]
fn power_is_station_power_while_occupied() {
    let run = flat_run();
    let charging = run
        .outcomes
        .iter()
        .filter(|o| o.total_power_kw > 0.0)
        .count();
    assert_eq!(charging, run.tallies[0].occupied_steps);
    assert!(run.outcomes.iter().all(|o| o.total_power_kw == 0.0 || o.total_power_kw == 50.0));
}

#[test]
fn run_ends_when_the_network_is_empty() {
    let run = flat_run();
    // 200 m at 1 m/s plus the charging dwell
    assert!(run.outcomes.len() > 200);
    assert!(run.outcomes.len() < 300);
    assert_eq!(run.steps_taken, run.outcomes.len());
    assert_eq!(run.report.kpi.total_steps, run.outcomes.len());
}

#[test]
fn utilization_matches_occupied_share() {
    let run = flat_run();
    let kpi = &run.report.kpi;
    assert_eq!(kpi.stations.len(), 1);
    let station = &kpi.stations[0];
    assert_eq!(station.station_id, "CS_0");
    assert!((0.0..=1.0).contains(&station.utilization_rate));
    let expected = run.tallies[0].occupied_steps as f64 / run.outcomes.len() as f64;
    assert!((station.utilization_rate - expected).abs() < 1e-12);
    assert!(kpi.peak_to_average > 1.0);
}

#[test]
fn step_cap_stops_the_run() {
    let mut params = common::params(PricingStrategy::Flat);
    params.max_steps = 10;
    let sim = common::single_station().with_vehicle(common::slow_ev("veh0"));
    let run = common::run(sim, params, RecommendationSeries::empty());

    assert_eq!(run.outcomes.len(), 10);
    assert_eq!(run.steps_taken, 10);
    assert_eq!(run.report.prices.len(), 10);
    assert_eq!(run.report.kpi.total_steps, 10);
}

#[test]
fn same_seed_gives_identical_runs() {
    let build = || {
        common::single_station()
            .with_vehicle(common::slow_ev("a"))
            .with_vehicle(common::slow_ev("b").departing_at(40))
            .with_vehicle(common::slow_ev("c").departing_at(120))
    };
    let mut params = common::params(PricingStrategy::Flat);
    params.cooldown_s = 0.0;
    params.seed = 7;

    let first = common::run(build(), params.clone(), RecommendationSeries::empty());
    let second = common::run(build(), params, RecommendationSeries::empty());

    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(first.tallies, second.tallies);
    assert_eq!(first.report.assigned, second.report.assigned);
    assert_eq!(first.report.prices, second.report.prices);
}

#[test]
fn empty_network_runs_zero_steps() {
    let sim = common::single_station();
    let run = common::run(
        sim,
        common::params(PricingStrategy::Flat),
        RecommendationSeries::empty(),
    );
    assert!(run.outcomes.is_empty());
    assert_eq!(run.report.kpi.total_revenue, 0.0);
    assert_eq!(run.report.kpi.peak_to_average, 0.0);
}

#[test]
fn vehicle_past_the_station_is_never_offered() {
    let sim = common::single_station().with_vehicle(ScriptedVehicle::new("late", common::LANE).at(95.0));
    let run = common::run(
        sim,
        common::params(PricingStrategy::Flat),
        RecommendationSeries::empty(),
    );
    assert!(run.report.assigned.is_empty());
    assert_eq!(run.tallies[0].occupied_steps, 0);
}
