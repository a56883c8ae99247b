//! Message codes.
//!
//! Codes `0x01..=0x3F` are commands sent by the host. Each command is answered
//! by a response carrying the command code with the high bit set
//! (`0x81..=0xBF`). Codes `0xC0..=0xC9` are unsolicited data streams.

/// Set module debug level.
pub const SET_DEBUG_LEVEL: u8 = 0x01;
/// Set serial baud rate.
pub const SET_BAUDRATE: u8 = 0x02;
/// Liveness check.
pub const PING: u8 = 0x03;
/// Query a system information string.
pub const GET_SYSTEM_INFO: u8 = 0x04;
/// Reset the module.
pub const MODULE_RESET: u8 = 0x05;
/// Reset all parameters to factory presets.
pub const FACTORY_RESET: u8 = 0x06;
/// Enter the firmware bootloader.
pub const START_BOOTLOADER: u8 = 0x07;
/// Run a manufacturing test.
pub const SYSTEM_RUN_TEST: u8 = 0x08;
/// Load a profile.
pub const LOAD_PROFILE: u8 = 0x09;
/// Query the loaded profile id.
pub const GET_PROFILE_ID: u8 = 0x0A;
/// Set sensor run mode.
pub const SET_SENSOR_MODE: u8 = 0x0B;
/// Query sensor run mode.
pub const GET_SENSOR_MODE: u8 = 0x0C;
/// Set overall sensitivity.
pub const SET_SENSITIVITY: u8 = 0x0D;
/// Set the detection zone.
pub const SET_DETECTION_ZONE: u8 = 0x0E;
/// Query the detection zone.
pub const GET_DETECTION_ZONE: u8 = 0x0F;
/// Query detection zone limits.
pub const GET_DETECTION_ZONE_LIMITS: u8 = 0x10;
/// Configure the LED.
pub const SET_LED_CONTROL: u8 = 0x11;
/// Enable or disable an output feature.
pub const SET_OUTPUT_CONTROL: u8 = 0x12;
/// Load the stored noisemap.
pub const LOAD_NOISEMAP: u8 = 0x13;
/// Store the current noisemap to flash.
pub const STORE_NOISEMAP: u8 = 0x14;
/// Set noisemap control bitfield.
pub const SET_NOISEMAP_CONTROL: u8 = 0x15;
/// Query noisemap control bitfield.
pub const GET_NOISEMAP_CONTROL: u8 = 0x16;
/// Read a named parameter file.
pub const GET_PARAMETER_FILE: u8 = 0x17;
/// Write a named parameter file.
pub const SET_PARAMETER_FILE: u8 = 0x18;

/// Last valid command code.
pub const LAST_COMMAND: u8 = 0x3F;

/// High bit marking a response to the command in the low bits.
pub const RESPONSE_FLAG: u8 = 0x80;

/// Baseband amplitude/phase stream.
pub const DATA_BASEBAND_AP: u8 = 0xC0;
/// Baseband I/Q stream.
pub const DATA_BASEBAND_IQ: u8 = 0xC1;
/// Legacy respiration status stream.
pub const DATA_RESPIRATION_LEGACY: u8 = 0xC2;
/// Sleep status stream.
pub const DATA_SLEEP: u8 = 0xC3;
/// Respiration moving-list stream.
pub const DATA_RESPIRATION_MOVING_LIST: u8 = 0xC4;
/// Respiration detection-list stream.
pub const DATA_RESPIRATION_DETECTION_LIST: u8 = 0xC5;
/// Pulse-Doppler float stream.
pub const DATA_PULSE_DOPPLER_FLOAT: u8 = 0xC6;
/// Pulse-Doppler byte stream.
pub const DATA_PULSE_DOPPLER_BYTE: u8 = 0xC7;
/// Noisemap float stream.
pub const DATA_NOISEMAP_FLOAT: u8 = 0xC8;
/// Noisemap byte stream.
pub const DATA_NOISEMAP_BYTE: u8 = 0xC9;

/// Coarse classification of a message code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass {
    Command,
    Response,
    Data,
    Unknown,
}

impl CodeClass {
    /// Classify a message code by range.
    pub fn of(code: u8) -> Self {
        match code {
            0x01..=LAST_COMMAND => CodeClass::Command,
            0x81..=0xBF => CodeClass::Response,
            DATA_BASEBAND_AP..=DATA_NOISEMAP_BYTE => CodeClass::Data,
            _ => CodeClass::Unknown,
        }
    }
}

/// Response code answering `command`.
pub fn response_code(command: u8) -> u8 {
    command | RESPONSE_FLAG
}

/// Command answered by a response code, if `code` is a response.
pub fn command_for_response(code: u8) -> Option<u8> {
    match CodeClass::of(code) {
        CodeClass::Response => Some(code & !RESPONSE_FLAG),
        _ => None,
    }
}

/// Returns a human-readable name for a message code.
pub fn code_name(code: u8) -> &'static str {
    let command = command_for_response(code).unwrap_or(code);
    match command {
        SET_DEBUG_LEVEL => "SET_DEBUG_LEVEL",
        SET_BAUDRATE => "SET_BAUDRATE",
        PING => "PING",
        GET_SYSTEM_INFO => "GET_SYSTEM_INFO",
        MODULE_RESET => "MODULE_RESET",
        FACTORY_RESET => "FACTORY_RESET",
        START_BOOTLOADER => "START_BOOTLOADER",
        SYSTEM_RUN_TEST => "SYSTEM_RUN_TEST",
        LOAD_PROFILE => "LOAD_PROFILE",
        GET_PROFILE_ID => "GET_PROFILE_ID",
        SET_SENSOR_MODE => "SET_SENSOR_MODE",
        GET_SENSOR_MODE => "GET_SENSOR_MODE",
        SET_SENSITIVITY => "SET_SENSITIVITY",
        SET_DETECTION_ZONE => "SET_DETECTION_ZONE",
        GET_DETECTION_ZONE => "GET_DETECTION_ZONE",
        GET_DETECTION_ZONE_LIMITS => "GET_DETECTION_ZONE_LIMITS",
        SET_LED_CONTROL => "SET_LED_CONTROL",
        SET_OUTPUT_CONTROL => "SET_OUTPUT_CONTROL",
        LOAD_NOISEMAP => "LOAD_NOISEMAP",
        STORE_NOISEMAP => "STORE_NOISEMAP",
        SET_NOISEMAP_CONTROL => "SET_NOISEMAP_CONTROL",
        GET_NOISEMAP_CONTROL => "GET_NOISEMAP_CONTROL",
        GET_PARAMETER_FILE => "GET_PARAMETER_FILE",
        SET_PARAMETER_FILE => "SET_PARAMETER_FILE",
        DATA_BASEBAND_AP => "BASEBAND_AP",
        DATA_BASEBAND_IQ => "BASEBAND_IQ",
        DATA_RESPIRATION_LEGACY => "RESPIRATION_LEGACY",
        DATA_SLEEP => "SLEEP",
        DATA_RESPIRATION_MOVING_LIST => "RESPIRATION_MOVING_LIST",
        DATA_RESPIRATION_DETECTION_LIST => "RESPIRATION_DETECTION_LIST",
        DATA_PULSE_DOPPLER_FLOAT => "PULSE_DOPPLER_FLOAT",
        DATA_PULSE_DOPPLER_BYTE => "PULSE_DOPPLER_BYTE",
        DATA_NOISEMAP_FLOAT => "NOISEMAP_FLOAT",
        DATA_NOISEMAP_BYTE => "NOISEMAP_BYTE",
        _ => "UNKNOWN",
    }
}
