//! Runs the SUMO tool chain and post-processes its output into a scenario.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::ScenarioError;
use super::network::RoadNetwork;
use super::placement::{PlannedStation, place_stations, write_additional};
use super::routes::tag_ev_routes;
use crate::config::ScenarioConfig;
use crate::traci::sumo_bin;

/// Files produced by a scenario build.
#[derive(Debug, Clone)]
pub struct BuiltScenario {
    pub net: PathBuf,
    pub routes: PathBuf,
    pub additional: PathBuf,
    pub vehicles: usize,
    pub stations: Vec<PlannedStation>,
}

/// Scenario generation for one configuration.
pub struct ScenarioBuilder<'a> {
    cfg: &'a ScenarioConfig,
}

fn read(path: &Path) -> Result<String, ScenarioError> {
    fs::read_to_string(path).map_err(|source| ScenarioError::File {
        path: path.display().to_string(),
        source,
    })
}

fn create(path: &Path) -> Result<io::BufWriter<fs::File>, ScenarioError> {
    let file = fs::File::create(path).map_err(|source| ScenarioError::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(io::BufWriter::new(file))
}

fn run_tool(name: &str, mut cmd: Command) -> Result<(), ScenarioError> {
    info!(tool = name, command = ?cmd, "running");
    let status = cmd.status().map_err(|source| ScenarioError::ToolSpawn {
        tool: name.into(),
        source,
    })?;
    if !status.success() {
        return Err(ScenarioError::ToolFailed {
            tool: name.into(),
            status,
        });
    }
    Ok(())
}

impl<'a> ScenarioBuilder<'a> {
    pub fn new(cfg: &'a ScenarioConfig) -> Self {
        Self { cfg }
    }

    fn net_path(&self) -> PathBuf {
        self.cfg.scenario.resolve(&self.cfg.scenario.net)
    }

    fn trips_path(&self) -> PathBuf {
        self.cfg.scenario.resolve(&self.cfg.builder.trips_file)
    }

    fn base_routes_path(&self) -> PathBuf {
        self.cfg.scenario.resolve(&self.cfg.builder.base_routes_file)
    }

    /// `netgenerate` call for a single-lane grid.
    pub fn netgenerate_command(&self) -> Command {
        let b = &self.cfg.builder;
        let mut cmd = Command::new(sumo_bin("netgenerate"));
        cmd.arg("--grid")
            .arg("--grid.number")
            .arg(b.grid_number.to_string())
            .arg("--grid.length")
            .arg(b.grid_length.to_string())
            .arg("--default.lanenumber")
            .arg(b.lane_number.to_string())
            .arg("--default.speed")
            .arg(b.default_speed.to_string())
            .arg("--output-file")
            .arg(self.net_path());
        cmd
    }

    /// `randomTrips.py` call from `$SUMO_HOME/tools`.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::SumoHomeUnset` if `SUMO_HOME` is not set.
    pub fn random_trips_command(&self) -> Result<Command, ScenarioError> {
        let home = env::var_os("SUMO_HOME").ok_or(ScenarioError::SumoHomeUnset)?;
        let script = Path::new(&home).join("tools").join("randomTrips.py");
        let b = &self.cfg.builder;
        let mut cmd = Command::new(&b.python);
        cmd.arg(script)
            .arg("-n")
            .arg(self.net_path())
            .arg("-e")
            .arg(b.end_time_s.to_string())
            .arg("-p")
            .arg(format!("{:.1}", b.trip_period_s))
            .arg("-o")
            .arg(self.trips_path())
            .arg("--seed")
            .arg(b.trip_seed.to_string())
            .arg("--min-distance")
            .arg(b.min_distance.to_string());
        Ok(cmd)
    }

    /// `duarouter` call turning trips into routes.
    pub fn duarouter_command(&self) -> Command {
        let mut cmd = Command::new(sumo_bin("duarouter"));
        cmd.arg("-n")
            .arg(self.net_path())
            .arg("-t")
            .arg(self.trips_path())
            .arg("-o")
            .arg(self.base_routes_path());
        cmd
    }

    /// Generates network, trips and routes with the SUMO tools, then tags
    /// the routes and places the stations.
    ///
    /// # Errors
    ///
    /// Returns a `ScenarioError` if a tool fails or an output file cannot
    /// be processed.
    pub fn build(&self) -> Result<BuiltScenario, ScenarioError> {
        let dir = &self.cfg.scenario.dir;
        fs::create_dir_all(dir).map_err(|source| ScenarioError::File {
            path: dir.display().to_string(),
            source,
        })?;

        run_tool("netgenerate", self.netgenerate_command())?;
        run_tool("randomTrips", self.random_trips_command()?)?;
        run_tool("duarouter", self.duarouter_command())?;
        self.finish()
    }

    /// Post-processing on existing tool output: EV-tags the base routes
    /// and writes the charging-station additional file.
    ///
    /// # Errors
    ///
    /// Returns a `ScenarioError` if an input is missing or malformed.
    pub fn finish(&self) -> Result<BuiltScenario, ScenarioError> {
        let files = &self.cfg.scenario;
        let b = &self.cfg.builder;

        let routes = files.resolve(&files.routes);
        let base = read(&self.base_routes_path())?;
        let mut out = create(&routes)?;
        let vehicles = tag_ev_routes(&base, &b.ev, &mut out)?;
        out.flush()?;
        info!(path = %routes.display(), vehicles, "wrote EV routes");

        let net_path = self.net_path();
        let net = RoadNetwork::load(&net_path)?;
        let stations = place_stations(&net, b.station_count)?;
        let additional = files.resolve(&files.additional);
        let mut out = create(&additional)?;
        write_additional(&stations, b.station_power_kw, b.station_efficiency, &mut out)?;
        out.flush()?;
        info!(path = %additional.display(), stations = stations.len(), "wrote charging stations");

        Ok(BuiltScenario {
            net: net_path,
            routes,
            additional,
            vehicles,
            stations,
        })
    }
}

/// Arguments of a command as strings, for logging and tests.
pub fn command_args(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: &str = r#"<net>
    <edge id="A1B1" from="A1" to="B1"><lane id="A1B1_0" length="187.20"/></edge>
    <edge id="B0B1" from="B0" to="B1"><lane id="B0B1_0" length="190.40"/></edge>
    <edge id="B1A1" from="B1" to="A1"><lane id="B1A1_0" length="187.20"/></edge>
    <junction id="A1" type="priority" x="0.00" y="200.00"/>
    <junction id="B1" type="priority" x="200.00" y="200.00"/>
    <junction id="B0" type="priority" x="200.00" y="0.00"/>
    <junction id="C1" type="priority" x="400.00" y="200.00"/>
    <junction id="B2" type="priority" x="200.00" y="400.00"/>
</net>"#;

    const ROUTES: &str = r#"<routes>
    <vehicle id="0" depart="0.00"><route edges="A1B1"/></vehicle>
    <vehicle id="1" depart="6.00"><route edges="B0B1"/></vehicle>
    <vehicle id="2" depart="12.00"><route edges="B1A1"/></vehicle>
</routes>"#;

    fn config(dir: &Path) -> ScenarioConfig {
        let mut cfg = ScenarioConfig::default();
        cfg.scenario.dir = dir.to_path_buf();
        cfg
    }

    #[test]
    fn netgenerate_arguments() {
        let cfg = config(Path::new("out"));
        let args = command_args(&ScenarioBuilder::new(&cfg).netgenerate_command());
        assert_eq!(
            args,
            vec![
                "--grid",
                "--grid.number",
                "3",
                "--grid.length",
                "200",
                "--default.lanenumber",
                "1",
                "--default.speed",
                "13.89",
                "--output-file",
                "out/ev_map.net.xml",
            ]
        );
    }

    #[test]
    fn duarouter_arguments() {
        let cfg = config(Path::new("out"));
        let args = command_args(&ScenarioBuilder::new(&cfg).duarouter_command());
        assert_eq!(
            args,
            vec![
                "-n",
                "out/ev_map.net.xml",
                "-t",
                "out/trips_600.trips",
                "-o",
                "out/ev_routes_base_600.rou.xml",
            ]
        );
    }

    #[test]
    fn finish_tags_routes_and_places_stations() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ev_map.net.xml"), NET).unwrap();
        fs::write(dir.path().join("ev_routes_base_600.rou.xml"), ROUTES).unwrap();

        let cfg = config(dir.path());
        let built = ScenarioBuilder::new(&cfg).finish().unwrap();
        assert_eq!(built.vehicles, 3);
        assert_eq!(built.stations.len(), 2);
        assert_eq!(built.stations[0].lane, "B0B1_0");

        let routes = fs::read_to_string(&built.routes).unwrap();
        assert_eq!(routes.matches("type=\"EV\"").count(), 3);
        let additional = fs::read_to_string(&built.additional).unwrap();
        assert_eq!(additional.matches("<chargingStation").count(), 2);
        assert!(additional.contains("id=\"CS_1\" lane=\"A1B1_0\""));
    }

    #[test]
    fn finish_without_tool_output_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let err = ScenarioBuilder::new(&cfg).finish().unwrap_err();
        assert!(err.to_string().contains("ev_routes_base_600.rou.xml"));
    }
}
