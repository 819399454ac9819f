//! Charging-station placement around the network centre and the
//! additional-file writer.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use serde::Serialize;
use tracing::{info, warn};

use super::ScenarioError;
use super::network::RoadNetwork;

/// A station to be written to the additional file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStation {
    pub id: String,
    pub lane: String,
    pub start_pos: f64,
    pub end_pos: f64,
}

/// Station span `(start, end)` on a lane of length `length` (m).
///
/// The span starts 20% into the lane, kept within 10 to 20 m, and ends at
/// 40% of the lane, at least 60 m in and at most 5 m before the lane end.
pub fn station_span(length: f64) -> (f64, f64) {
    let start = (0.2 * length).min(20.0).max(10.0);
    let end = (0.4 * length).max(60.0).min(length - 5.0);
    (start, end)
}

/// Places up to `count` stations on the longest lanes entering the central
/// junction. Lanes too short to hold a span are skipped.
///
/// # Errors
///
/// Returns `ScenarioError::NoJunctions` for an empty network and
/// `ScenarioError::NoIncomingLanes` if the central junction has no
/// incoming lanes.
pub fn place_stations(
    net: &RoadNetwork,
    count: usize,
) -> Result<Vec<PlannedStation>, ScenarioError> {
    let centre = net.central_junction().ok_or(ScenarioError::NoJunctions)?;
    let mut lanes = net.incoming_lanes(&centre.id);
    if lanes.is_empty() {
        return Err(ScenarioError::NoIncomingLanes {
            junction: centre.id.clone(),
        });
    }
    // stable: equal lengths keep file order
    lanes.sort_by(|a, b| b.length.total_cmp(&a.length));

    let mut stations = Vec::with_capacity(count);
    for lane in lanes.into_iter().take(count) {
        let (start, end) = station_span(lane.length);
        if end <= start {
            warn!(lane = %lane.id, length = lane.length, "lane too short for a station");
            continue;
        }
        stations.push(PlannedStation {
            id: format!("CS_{}", stations.len()),
            lane: lane.id.clone(),
            start_pos: start,
            end_pos: end,
        });
    }
    info!(junction = %centre.id, stations = stations.len(), "placed charging stations");
    Ok(stations)
}

/// Writes an `<additional>` document with one `chargingStation` per entry.
///
/// # Errors
///
/// Returns a `ScenarioError` if writing fails.
pub fn write_additional(
    stations: &[PlannedStation],
    power_kw: f64,
    efficiency: f64,
    out: impl Write,
) -> Result<(), ScenarioError> {
    let mut w = Writer::new_with_indent(out, b' ', 4);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    w.write_event(Event::Start(BytesStart::new("additional")))?;

    let power = format!("{power_kw}");
    let efficiency = format!("{efficiency}");
    for s in stations {
        let start = format!("{:.1}", s.start_pos);
        let end = format!("{:.1}", s.end_pos);
        let mut cs = BytesStart::new("chargingStation");
        cs.push_attribute(("id", s.id.as_str()));
        cs.push_attribute(("lane", s.lane.as_str()));
        cs.push_attribute(("startPos", start.as_str()));
        cs.push_attribute(("endPos", end.as_str()));
        cs.push_attribute(("power", power.as_str()));
        cs.push_attribute(("efficiency", efficiency.as_str()));
        cs.push_attribute(("chargeInTransit", "false"));
        w.write_event(Event::Empty(cs))?;
    }

    w.write_event(Event::End(BytesEnd::new("additional")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::network::{Edge, Junction, Lane};

    fn junction(id: &str, x: f64, y: f64) -> Junction {
        Junction {
            id: id.into(),
            x,
            y,
        }
    }

    fn edge(id: &str, to: &str, lengths: &[f64]) -> Edge {
        Edge {
            id: id.into(),
            from: "X".into(),
            to: to.into(),
            lanes: lengths
                .iter()
                .enumerate()
                .map(|(i, &length)| Lane {
                    id: format!("{id}_{i}"),
                    length,
                })
                .collect(),
        }
    }

    fn network() -> RoadNetwork {
        RoadNetwork {
            junctions: vec![
                junction("A", 0.0, 0.0),
                junction("C", 100.0, 100.0),
                junction("B", 200.0, 200.0),
            ],
            edges: vec![
                edge("e1", "C", &[150.0]),
                edge("e2", "C", &[190.0, 190.0]),
                edge("e3", "C", &[120.0]),
                edge("e4", "C", &[180.0]),
                edge("e5", "A", &[500.0]),
            ],
        }
    }

    #[test]
    fn span_for_typical_lanes() {
        // 0.2 * 187.2 = 37.44 -> capped at 20; 0.4 * 187.2 = 74.88
        let (s, e) = station_span(187.2);
        assert_eq!(s, 20.0);
        assert!((e - 74.88).abs() < 1e-9);

        // short lane: start floor 10, end 5 m before the lane end
        assert_eq!(station_span(40.0), (10.0, 35.0));
    }

    #[test]
    fn span_end_floor_is_sixty_metres() {
        let (s, e) = station_span(120.0);
        assert_eq!(s, 20.0);
        assert_eq!(e, 60.0);
    }

    #[test]
    fn picks_longest_incoming_lanes() {
        let stations = place_stations(&network(), 4).unwrap();
        let lanes: Vec<&str> = stations.iter().map(|s| s.lane.as_str()).collect();
        assert_eq!(lanes, vec!["e2_0", "e2_1", "e4_0", "e1_0"]);
        let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["CS_0", "CS_1", "CS_2", "CS_3"]);
    }

    #[test]
    fn fewer_lanes_than_requested() {
        let stations = place_stations(&network(), 10).unwrap();
        assert_eq!(stations.len(), 5);
    }

    #[test]
    fn too_short_lanes_are_skipped() {
        let net = RoadNetwork {
            junctions: vec![junction("C", 0.0, 0.0)],
            edges: vec![edge("short", "C", &[12.0]), edge("ok", "C", &[100.0])],
        };
        let stations = place_stations(&net, 4).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].lane, "ok_0");
        assert_eq!(stations[0].id, "CS_0");
    }

    #[test]
    fn isolated_centre_is_an_error() {
        let net = RoadNetwork {
            junctions: vec![junction("C", 0.0, 0.0)],
            edges: vec![],
        };
        assert!(matches!(
            place_stations(&net, 4),
            Err(ScenarioError::NoIncomingLanes { .. })
        ));
    }

    #[test]
    fn additional_file_contents() {
        let stations = vec![PlannedStation {
            id: "CS_0".into(),
            lane: "A1B1_0".into(),
            start_pos: 20.0,
            end_pos: 74.88,
        }];
        let mut buf = Vec::new();
        write_additional(&stations, 50.0, 0.9, &mut buf).unwrap();
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains(
            r#"<chargingStation id="CS_0" lane="A1B1_0" startPos="20.0" endPos="74.9" power="50" efficiency="0.9" chargeInTransit="false"/>"#
        ));
        assert!(xml.trim_end().ends_with("</additional>"));
    }
}
