//! ev-price-sim entry point: CLI wiring, scenario build and session run.

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ev_price_sim::cli::{BuildArgs, Cli, Commands, RunArgs};
use ev_price_sim::config::ScenarioConfig;
use ev_price_sim::io::export::{export_kpi_csv, export_price_csv};
use ev_price_sim::io::series::RecommendationSeries;
use ev_price_sim::scenario::ScenarioBuilder;
use ev_price_sim::sim::engine::Session;
#[cfg(feature = "api")]
use ev_price_sim::sim::engine::SessionReport;
use ev_price_sim::traci::launch;

fn validated(cfg: ScenarioConfig) -> anyhow::Result<ScenarioConfig> {
    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        bail!("invalid configuration ({} error(s))", errors.len());
    }
    Ok(cfg)
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let cfg = validated(args.config()?)?;

    let series = if cfg.simulation.strategy.uses_recommendations() {
        let path = cfg.recommendations_path();
        RecommendationSeries::load(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else {
        RecommendationSeries::empty()
    };

    let client = launch(&cfg.launch_options()).context("failed to start SUMO")?;
    let mut session = Session::new(client, cfg.session_params(), series)?;
    session.run()?;
    let report = session.finish()?;

    let kpi_path = cfg.kpi_csv_path();
    export_kpi_csv(&report.kpi, &kpi_path)?;
    info!(path = %kpi_path.display(), "KPI written");
    let prices_path = cfg.prices_csv_path();
    export_price_csv(&report.prices, &prices_path)?;
    info!(path = %prices_path.display(), "prices written");

    println!("{}", report.kpi);

    #[cfg(feature = "api")]
    if args.serve {
        serve(cfg, report, args.port)?;
    }

    Ok(())
}

#[cfg(feature = "api")]
fn serve(config: ScenarioConfig, report: SessionReport, port: u16) -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let state = Arc::new(ev_price_sim::api::AppState {
        config,
        kpi: report.kpi,
        prices: report.prices,
        assigned: report.assigned,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    rt.block_on(ev_price_sim::api::serve(state, addr))?;
    Ok(())
}

fn build_scenario(args: &BuildArgs) -> anyhow::Result<()> {
    let cfg = validated(args.config()?)?;
    let built = ScenarioBuilder::new(&cfg).build()?;
    println!(
        "Scenario ready: {} vehicles, {} charging stations",
        built.vehicles,
        built.stations.len()
    );
    println!("  net:        {}", built.net.display());
    println!("  routes:     {}", built.routes.display());
    println!("  additional: {}", built.additional.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ev_price_sim=info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(args) => run(args),
        Commands::BuildScenario(args) => build_scenario(args),
    }
}
