//! EV tagging of a routed demand file.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::ScenarioError;
use crate::config::EvTypeConfig;

/// Id of the injected vehicle type.
pub const EV_TYPE_ID: &str = "EV";

impl EvTypeConfig {
    /// Battery-device parameters written as `<param>` children of the type.
    pub fn battery_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device.battery.probability", "1".into()),
            ("device.battery.capacity", format!("{}", self.battery_capacity)),
            ("device.battery.vehicleMass", format!("{}", self.vehicle_mass)),
            ("device.battery.powerMaximum", format!("{}", self.power_maximum)),
            (
                "device.battery.recuperationEfficiency",
                format!("{}", self.recuperation_efficiency),
            ),
            ("device.battery.device", "true".into()),
            ("device.battery.initialSoc", format!("{}", self.initial_soc)),
            ("device.battery.minimumSoc", format!("{}", self.minimum_soc)),
        ]
    }
}

fn write_ev_type<W: Write>(w: &mut Writer<W>, ev: &EvTypeConfig) -> Result<(), ScenarioError> {
    let max_speed = format!("{}", ev.max_speed);
    let accel = format!("{}", ev.accel);
    let decel = format!("{}", ev.decel);
    let mut vtype = BytesStart::new("vType");
    vtype.push_attribute(("id", EV_TYPE_ID));
    vtype.push_attribute(("vClass", "passenger"));
    vtype.push_attribute(("maxSpeed", max_speed.as_str()));
    vtype.push_attribute(("accel", accel.as_str()));
    vtype.push_attribute(("decel", decel.as_str()));
    w.write_event(Event::Text(BytesText::new("\n    ")))?;
    w.write_event(Event::Start(vtype))?;
    for (key, value) in ev.battery_params() {
        let mut param = BytesStart::new("param");
        param.push_attribute(("key", key));
        param.push_attribute(("value", value.as_str()));
        w.write_event(Event::Text(BytesText::new("\n        ")))?;
        w.write_event(Event::Empty(param))?;
    }
    w.write_event(Event::Text(BytesText::new("\n    ")))?;
    w.write_event(Event::End(BytesEnd::new("vType")))?;
    Ok(())
}

/// Copy of a `vehicle` element with its `type` set to [`EV_TYPE_ID`].
fn tag_vehicle(e: &BytesStart<'_>) -> Result<BytesStart<'static>, ScenarioError> {
    let mut out = BytesStart::new("vehicle");
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() != b"type" {
            out.push_attribute((a.key.as_ref(), a.value.as_ref()));
        }
    }
    out.push_attribute(("type", EV_TYPE_ID));
    Ok(out)
}

/// Rewrites a routes document: the `EV` vehicle type becomes the first child
/// of `<routes>` and every `<vehicle>` is given `type="EV"`. Everything else
/// is copied through unchanged.
///
/// Returns the number of vehicles tagged.
///
/// # Errors
///
/// Returns `ScenarioError::MissingRoutesElement` if the input has no
/// `<routes>` root, or an XML error if it cannot be parsed.
pub fn tag_ev_routes(
    xml: &str,
    ev: &EvTypeConfig,
    out: impl Write,
) -> Result<usize, ScenarioError> {
    let mut reader = Reader::from_str(xml);
    let mut w = Writer::new(out);
    let mut seen_routes = false;
    let mut tagged = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"routes" => {
                seen_routes = true;
                w.write_event(Event::Start(e))?;
                write_ev_type(&mut w, ev)?;
            }
            Event::Empty(e) if e.name().as_ref() == b"routes" => {
                seen_routes = true;
                w.write_event(Event::Start(e.borrow()))?;
                write_ev_type(&mut w, ev)?;
                w.write_event(Event::Text(BytesText::new("\n")))?;
                w.write_event(Event::End(e.to_end()))?;
            }
            Event::Start(e) if e.name().as_ref() == b"vehicle" => {
                tagged += 1;
                w.write_event(Event::Start(tag_vehicle(&e)?))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"vehicle" => {
                tagged += 1;
                w.write_event(Event::Empty(tag_vehicle(&e)?))?;
            }
            Event::Eof => break,
            other => w.write_event(other)?,
        }
    }

    if !seen_routes {
        return Err(ScenarioError::MissingRoutesElement);
    }
    Ok(tagged)
}
