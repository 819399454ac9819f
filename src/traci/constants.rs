//! TraCI command, variable and type identifiers used by this crate.

// commands
pub const CMD_GETVERSION: u8 = 0x00;
pub const CMD_SIMSTEP: u8 = 0x02;
pub const CMD_CLOSE: u8 = 0x7f;

// get/set command domains; responses to a get are `get + 0x10`
pub const CMD_GET_CHARGINGSTATION_VARIABLE: u8 = 0x25;
pub const CMD_GET_LANE_VARIABLE: u8 = 0xa3;
pub const CMD_GET_VEHICLE_VARIABLE: u8 = 0xa4;
pub const CMD_GET_SIM_VARIABLE: u8 = 0xab;
pub const CMD_SET_VEHICLE_VARIABLE: u8 = 0xc4;
pub const RESPONSE_OFFSET: u8 = 0x10;

// variables
pub const TRACI_ID_LIST: u8 = 0x00;
pub const LAST_STEP_VEHICLE_ID_LIST: u8 = 0x12;
pub const CMD_STOP: u8 = 0x12;
pub const VAR_SPEED: u8 = 0x40;
pub const VAR_POSITION: u8 = 0x42;
pub const VAR_LANE_ID: u8 = 0x51;
pub const VAR_LANEPOSITION: u8 = 0x56;
pub const VAR_TIME: u8 = 0x66;
pub const VAR_MIN_EXPECTED_VEHICLES: u8 = 0x7d;
pub const VAR_PARAMETER: u8 = 0x7e;

// data types
pub const TYPE_BYTE: u8 = 0x08;
pub const TYPE_INTEGER: u8 = 0x09;
pub const TYPE_DOUBLE: u8 = 0x0b;
pub const TYPE_STRING: u8 = 0x0c;
pub const TYPE_STRINGLIST: u8 = 0x0e;
pub const TYPE_COMPOUND: u8 = 0x0f;

// result codes
pub const RTYPE_OK: u8 = 0x00;
pub const RTYPE_NOTIMPLEMENTED: u8 = 0x01;
pub const RTYPE_ERR: u8 = 0xff;

// stop flags
pub const STOP_CHARGING_STATION: u8 = 0x20;

pub const INVALID_DOUBLE_VALUE: f64 = -1_073_741_824.0;
