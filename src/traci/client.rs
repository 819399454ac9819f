use std::io::{Read, Write};
use std::net::TcpStream;

use tracing::{debug, trace};

use super::TraciError;
use super::codec::{Reader, Storage, encode_command, encode_message};
use super::constants::*;
use super::launch::SumoProcess;
use crate::sim::simulator::{SimError, StationGeometry, TrafficSimulator};

/// Blocking TraCI connection.
///
/// Generic over the stream so tests can replay canned responses; in
/// production it wraps a `TcpStream` and, when it launched SUMO itself, the
/// child process, which is killed when the client drops.
#[derive(Debug)]
pub struct TraciClient<S: Read + Write = TcpStream> {
    stream: S,
    process: Option<SumoProcess>,
    closed: bool,
}

impl TraciClient<TcpStream> {
    /// Opens a connection to a TraCI server on localhost.
    pub fn connect(port: u16) -> Result<Self, TraciError> {
        let stream = TcpStream::connect(("127.0.0.1", port))?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub(super) fn attach(mut self, process: SumoProcess) -> Self {
        self.process = Some(process);
        self
    }
}

impl<S: Read + Write> TraciClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            process: None,
            closed: false,
        }
    }

    /// Queries the server's API version and version string.
    pub fn version(&mut self) -> Result<(i32, String), TraciError> {
        let cmd = encode_command(CMD_GETVERSION, &[]);
        let body = self.round_trip(&[cmd])?;
        let mut r = Reader::new(&body);
        check_status(&mut r, CMD_GETVERSION)?;
        let (id, mut content) = r.read_command()?;
        if id != CMD_GETVERSION {
            return Err(TraciError::Protocol(format!(
                "expected version response, got command 0x{id:02x}"
            )));
        }
        let api = content.read_i32()?;
        let name = content.read_string()?;
        Ok((api, name))
    }

    /// Advances the simulation by one step.
    pub fn simulation_step(&mut self) -> Result<(), TraciError> {
        let mut content = Storage::new();
        content.write_f64(0.0);
        let cmd = encode_command(CMD_SIMSTEP, content.as_bytes());
        let body = self.round_trip(&[cmd])?;
        let mut r = Reader::new(&body);
        check_status(&mut r, CMD_SIMSTEP)?;
        let subscriptions = r.read_i32()?;
        trace!(subscriptions, "simulation step");
        Ok(())
    }

    /// Sends the close command. Further calls are no-ops.
    pub fn close(&mut self) -> Result<(), TraciError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let cmd = encode_command(CMD_CLOSE, &[]);
        let body = self.round_trip(&[cmd])?;
        check_status(&mut Reader::new(&body), CMD_CLOSE)?;
        debug!("traci connection closed");
        Ok(())
    }

    /// Issues a get command and parses the typed value with `parse`.
    fn get<T>(
        &mut self,
        domain: u8,
        variable: u8,
        object: &str,
        extra: &[u8],
        parse: impl FnOnce(&mut Reader<'_>) -> Result<T, TraciError>,
    ) -> Result<T, TraciError> {
        let mut content = Storage::new();
        content.write_u8(variable).write_string(object).write_bytes(extra);
        let cmd = encode_command(domain, content.as_bytes());
        let body = self.round_trip(&[cmd])?;

        let mut r = Reader::new(&body);
        check_status(&mut r, domain)?;
        let (id, mut value) = r.read_command()?;
        if id != domain + RESPONSE_OFFSET {
            return Err(TraciError::Protocol(format!(
                "expected response 0x{:02x}, got 0x{id:02x}",
                domain + RESPONSE_OFFSET
            )));
        }
        let var = value.read_u8()?;
        if var != variable {
            return Err(TraciError::Protocol(format!(
                "expected variable 0x{variable:02x}, got 0x{var:02x}"
            )));
        }
        let _object = value.read_string()?;
        parse(&mut value)
    }

    pub fn get_f64(&mut self, domain: u8, variable: u8, object: &str) -> Result<f64, TraciError> {
        self.get(domain, variable, object, &[], |r| r.read_typed_f64())
    }

    pub fn get_i32(&mut self, domain: u8, variable: u8, object: &str) -> Result<i32, TraciError> {
        self.get(domain, variable, object, &[], |r| r.read_typed_i32())
    }

    pub fn get_string(
        &mut self,
        domain: u8,
        variable: u8,
        object: &str,
    ) -> Result<String, TraciError> {
        self.get(domain, variable, object, &[], |r| r.read_typed_string())
    }

    pub fn get_string_list(
        &mut self,
        domain: u8,
        variable: u8,
        object: &str,
    ) -> Result<Vec<String>, TraciError> {
        self.get(domain, variable, object, &[], |r| r.read_typed_string_list())
    }

    /// Reads a generic `key` parameter of an object.
    pub fn get_parameter(
        &mut self,
        domain: u8,
        object: &str,
        key: &str,
    ) -> Result<String, TraciError> {
        let mut extra = Storage::new();
        extra.write_u8(TYPE_STRING).write_string(key);
        self.get(
            domain,
            VAR_PARAMETER,
            object,
            extra.as_bytes(),
            |r| r.read_typed_string(),
        )
    }

    /// Stops `vehicle` at charging station `station` until further notice.
    pub fn set_charging_station_stop(
        &mut self,
        vehicle: &str,
        station: &str,
    ) -> Result<(), TraciError> {
        let mut content = Storage::new();
        content
            .write_u8(CMD_STOP)
            .write_string(vehicle)
            .write_u8(TYPE_COMPOUND)
            .write_i32(7)
            .write_u8(TYPE_STRING)
            .write_string(station)
            .write_u8(TYPE_DOUBLE)
            .write_f64(1.0)
            .write_u8(TYPE_BYTE)
            .write_u8(0)
            .write_u8(TYPE_DOUBLE)
            .write_f64(-1.0)
            .write_u8(TYPE_BYTE)
            .write_u8(STOP_CHARGING_STATION)
            .write_u8(TYPE_DOUBLE)
            .write_f64(INVALID_DOUBLE_VALUE)
            .write_u8(TYPE_DOUBLE)
            .write_f64(INVALID_DOUBLE_VALUE);
        let cmd = encode_command(CMD_SET_VEHICLE_VARIABLE, content.as_bytes());
        let body = self.round_trip(&[cmd])?;
        check_status(&mut Reader::new(&body), CMD_SET_VEHICLE_VARIABLE)
    }

    /// Writes one message and returns the body of the response message.
    fn round_trip(&mut self, commands: &[Vec<u8>]) -> Result<Vec<u8>, TraciError> {
        let msg = encode_message(commands);
        self.stream.write_all(&msg)?;
        self.stream.flush()?;

        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len)?;
        let total = u32::from_be_bytes(len) as usize;
        let body_len = total.checked_sub(4).ok_or_else(|| {
            TraciError::Protocol(format!("response length {total} too short"))
        })?;
        let mut body = vec![0u8; body_len];
        self.stream.read_exact(&mut body)?;
        Ok(body)
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Consumes the status block every response starts with.
fn check_status(r: &mut Reader<'_>, command: u8) -> Result<(), TraciError> {
    let (id, mut status) = r.read_command()?;
    if id != command {
        return Err(TraciError::Protocol(format!(
            "status for command 0x{id:02x}, expected 0x{command:02x}"
        )));
    }
    let result = status.read_u8()?;
    let description = status.read_string()?;
    match result {
        RTYPE_OK => Ok(()),
        RTYPE_NOTIMPLEMENTED => Err(TraciError::Command {
            command,
            description: format!("not implemented: {description}"),
        }),
        _ => Err(TraciError::Command {
            command,
            description,
        }),
    }
}

impl<S: Read + Write> TrafficSimulator for TraciClient<S> {
    fn step(&mut self) -> Result<(), SimError> {
        Ok(self.simulation_step()?)
    }

    fn time_s(&mut self) -> Result<f64, SimError> {
        Ok(self.get_f64(CMD_GET_SIM_VARIABLE, VAR_TIME, "")?)
    }

    fn min_expected_vehicles(&mut self) -> Result<i32, SimError> {
        Ok(self.get_i32(CMD_GET_SIM_VARIABLE, VAR_MIN_EXPECTED_VEHICLES, "")?)
    }

    fn charging_station_ids(&mut self) -> Result<Vec<String>, SimError> {
        Ok(self.get_string_list(CMD_GET_CHARGINGSTATION_VARIABLE, TRACI_ID_LIST, "")?)
    }

    fn charging_station(&mut self, id: &str) -> Result<StationGeometry, SimError> {
        let domain = CMD_GET_CHARGINGSTATION_VARIABLE;
        Ok(StationGeometry {
            lane: self.get_string(domain, VAR_LANE_ID, id)?,
            start_pos: self.get_f64(domain, VAR_POSITION, id)?,
            end_pos: self.get_f64(domain, VAR_LANEPOSITION, id)?,
        })
    }

    fn lane_vehicle_ids(&mut self, lane: &str) -> Result<Vec<String>, SimError> {
        Ok(self.get_string_list(CMD_GET_LANE_VARIABLE, LAST_STEP_VEHICLE_ID_LIST, lane)?)
    }

    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<f64, SimError> {
        Ok(self.get_f64(CMD_GET_VEHICLE_VARIABLE, VAR_LANEPOSITION, vehicle)?)
    }

    fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64, SimError> {
        Ok(self.get_f64(CMD_GET_VEHICLE_VARIABLE, VAR_SPEED, vehicle)?)
    }

    fn vehicle_parameter(&mut self, vehicle: &str, key: &str) -> Result<String, SimError> {
        Ok(self.get_parameter(CMD_GET_VEHICLE_VARIABLE, vehicle, key)?)
    }

    fn set_charging_station_stop(&mut self, vehicle: &str, station: &str) -> Result<(), SimError> {
        TraciClient::set_charging_station_stop(self, vehicle, station).map_err(|e| match e {
            TraciError::Command { description, .. } => SimError::Rejected(description),
            other => SimError::Traci(other),
        })
    }

    fn close(&mut self) -> Result<(), SimError> {
        Ok(TraciClient::close(self)?)
    }
}
