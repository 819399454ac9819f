//! Read-only view of a SUMO `.net.xml` road network.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::ScenarioError;

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub id: String,
    /// Lane length (m).
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub lanes: Vec<Lane>,
}

/// Non-internal junctions and edges of a network, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadNetwork {
    pub junctions: Vec<Junction>,
    pub edges: Vec<Edge>,
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ScenarioError> {
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == name.as_bytes() {
            return Ok(Some(String::from_utf8_lossy(&a.value).into_owned()));
        }
    }
    Ok(None)
}

fn required(e: &BytesStart<'_>, element: &str, name: &str) -> Result<String, ScenarioError> {
    attr(e, name)?.ok_or_else(|| ScenarioError::MissingAttribute {
        element: element.into(),
        name: name.into(),
    })
}

fn number(e: &BytesStart<'_>, element: &str, name: &str) -> Result<f64, ScenarioError> {
    let value = required(e, element, name)?;
    value
        .parse()
        .map_err(|_| ScenarioError::InvalidAttribute {
            element: element.into(),
            name: name.into(),
            value,
        })
}

impl RoadNetwork {
    /// Reads and parses a network file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let xml = fs::read_to_string(path).map_err(|source| ScenarioError::File {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Parses network XML. Internal junctions (`type="internal"` or ids
    /// starting with `:`) and internal edges (`function="internal"`) and
    /// their lanes are skipped.
    pub fn parse(xml: &str) -> Result<Self, ScenarioError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut net = Self::default();
        // index of the edge whose lanes are being read
        let mut open_edge: Option<usize> = None;
        let mut in_internal_edge = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"junction" => {
                    let id = required(&e, "junction", "id")?;
                    let internal = id.starts_with(':')
                        || attr(&e, "type")?.as_deref() == Some("internal");
                    if !internal {
                        net.junctions.push(Junction {
                            x: number(&e, "junction", "x")?,
                            y: number(&e, "junction", "y")?,
                            id,
                        });
                    }
                }
                Event::Start(e) if e.name().as_ref() == b"edge" => {
                    in_internal_edge = attr(&e, "function")?.as_deref() == Some("internal");
                    if !in_internal_edge {
                        net.edges.push(edge(&e)?);
                        open_edge = Some(net.edges.len() - 1);
                    }
                }
                Event::Empty(e) if e.name().as_ref() == b"edge" => {
                    if attr(&e, "function")?.as_deref() != Some("internal") {
                        net.edges.push(edge(&e)?);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"edge" => {
                    open_edge = None;
                    in_internal_edge = false;
                }
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"lane" => {
                    if in_internal_edge {
                        continue;
                    }
                    if let Some(idx) = open_edge {
                        net.edges[idx].lanes.push(Lane {
                            id: required(&e, "lane", "id")?,
                            length: number(&e, "lane", "length")?,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(net)
    }

    /// Junction closest to the centre of the junction bounding box. Ties go
    /// to the junction listed first.
    pub fn central_junction(&self) -> Option<&Junction> {
        let first = self.junctions.first()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for j in &self.junctions {
            min_x = min_x.min(j.x);
            max_x = max_x.max(j.x);
            min_y = min_y.min(j.y);
            max_y = max_y.max(j.y);
        }
        let (cx, cy) = (0.5 * (min_x + max_x), 0.5 * (min_y + max_y));

        let dist = |j: &Junction| (j.x - cx).powi(2) + (j.y - cy).powi(2);
        let mut best = first;
        for j in &self.junctions[1..] {
            if dist(j) < dist(best) {
                best = j;
            }
        }
        Some(best)
    }

    /// Lanes of all edges ending at `junction`, in file order.
    pub fn incoming_lanes(&self, junction: &str) -> Vec<&Lane> {
        self.edges
            .iter()
            .filter(|e| e.to == junction)
            .flat_map(|e| e.lanes.iter())
            .collect()
    }
}

fn edge(e: &BytesStart<'_>) -> Result<Edge, ScenarioError> {
    Ok(Edge {
        id: required(e, "edge", "id")?,
        from: required(e, "edge", "from")?,
        to: required(e, "edge", "to")?,
        lanes: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.20">
    <location netOffset="0.00,0.00" convBoundary="0.00,0.00,400.00,400.00"/>
    <edge id=":B1_0" function="internal">
        <lane id=":B1_0_0" index="0" speed="13.89" length="5.00" shape="0,0 1,1"/>
    </edge>
    <edge id="A1B1" from="A1" to="B1" priority="-1">
        <lane id="A1B1_0" index="0" speed="13.89" length="187.20" shape="0,0 1,1"/>
    </edge>
    <edge id="C1B1" from="C1" to="B1" priority="-1">
        <lane id="C1B1_0" index="0" speed="13.89" length="190.40" shape="0,0 1,1"/>
    </edge>
    <edge id="B1A1" from="B1" to="A1" priority="-1">
        <lane id="B1A1_0" index="0" speed="13.89" length="187.20" shape="0,0 1,1"/>
    </edge>
    <junction id="A1" type="priority" x="0.00" y="200.00" incLanes="" intLanes="" shape=""/>
    <junction id="B1" type="traffic_light" x="200.00" y="200.00" incLanes="" intLanes="" shape=""/>
    <junction id="C1" type="priority" x="400.00" y="200.00" incLanes="" intLanes="" shape=""/>
    <junction id="B0" type="priority" x="200.00" y="0.00" incLanes="" intLanes="" shape=""/>
    <junction id="B2" type="priority" x="200.00" y="400.00" incLanes="" intLanes="" shape=""/>
    <junction id=":B1_0_0" type="internal" x="201.00" y="201.00" incLanes="" intLanes=""/>
</net>
"#;

    #[test]
    fn skips_internal_elements() {
        let net = RoadNetwork::parse(NET).unwrap();
        assert_eq!(net.junctions.len(), 5);
        assert_eq!(net.edges.len(), 3);
        assert!(net.edges.iter().all(|e| !e.id.starts_with(':')));
        assert_eq!(net.edges[0].lanes[0].length, 187.2);
    }

    #[test]
    fn central_junction_is_grid_centre() {
        let net = RoadNetwork::parse(NET).unwrap();
        assert_eq!(net.central_junction().map(|j| j.id.as_str()), Some("B1"));
    }

    #[test]
    fn incoming_lanes_only() {
        let net = RoadNetwork::parse(NET).unwrap();
        let ids: Vec<&str> = net
            .incoming_lanes("B1")
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A1B1_0", "C1B1_0"]);
    }

    #[test]
    fn empty_network_has_no_centre() {
        let net = RoadNetwork::parse("<net/>").unwrap();
        assert!(net.central_junction().is_none());
    }

    #[test]
    fn bad_length_is_reported() {
        let xml = r#"<net><edge id="e" from="a" to="b"><lane id="e_0" length="long"/></edge></net>"#;
        let err = RoadNetwork::parse(xml).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidAttribute { ref name, .. } if name == "length"));
    }
}
