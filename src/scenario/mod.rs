//! Scenario generation: grid network, EV routes and charging stations.

mod builder;
pub mod network;
pub mod placement;
pub mod routes;

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

pub use builder::{BuiltScenario, ScenarioBuilder, command_args};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("<{element}> is missing attribute \"{name}\"")]
    MissingAttribute { element: String, name: String },

    #[error("<{element}> attribute \"{name}\" has invalid value \"{value}\"")]
    InvalidAttribute {
        element: String,
        name: String,
        value: String,
    },

    #[error("routes file has no <routes> element")]
    MissingRoutesElement,

    #[error("network has no junctions")]
    NoJunctions,

    #[error("junction \"{junction}\" has no incoming lanes")]
    NoIncomingLanes { junction: String },

    #[error("SUMO_HOME is not set; randomTrips.py cannot be located")]
    SumoHomeUnset,

    #[error("failed to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}")]
    ToolFailed { tool: String, status: ExitStatus },
}
