use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::info;
use xethru_frame::{codes, DEFAULT_MAX_PAYLOAD};
use xethru_transport::RadarStream;

use crate::config::ModuleConfig;
use crate::connection::Connection;
use crate::control::DeviceControlState;
use crate::dispatcher::ConnectionStats;
use crate::error::{ModuleError, Result};
use crate::messages::{
    BasebandApData, BasebandIqData, NoisemapByteData, NoisemapFloatData, PulseDopplerByteData,
    PulseDopplerFloatData, RespirationData, RespirationDetectionListData,
    RespirationMovingListData, SleepData,
};
use crate::payload::{PayloadError, PayloadReader, PayloadWriter};
use crate::queue::{DataQueues, SubscriptionQueue};
use crate::types::{
    DetectionZone, DetectionZoneLimits, LedMode, NoisemapControl, OutputControl, OutputFeature,
    Pong, SensorMode, SystemInfoCode,
};

const MAX_DEBUG_LEVEL: u8 = 9;
const MAX_SENSITIVITY: u32 = 9;
const MAX_LED_INTENSITY: u8 = 100;

/// Driver for the X4M200 respiration sensor.
///
/// Every operation is one or more command round trips. Operations that
/// change the sensor mode, profile, or output selection are validated
/// against [`DeviceControlState`] first and hold its lock until the module
/// has acknowledged them, so concurrent callers never observe a half-applied
/// change.
pub struct X4M200 {
    connection: Connection,
    state: Mutex<DeviceControlState>,
}

impl X4M200 {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            state: Mutex::new(DeviceControlState::default()),
        }
    }

    pub fn open(stream: RadarStream, config: ModuleConfig) -> Result<Self> {
        Ok(Self::new(Connection::open(stream, config)?))
    }

    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>, config: ModuleConfig) -> Result<Self> {
        Ok(Self::new(Connection::connect_unix(path, config)?))
    }

    #[cfg(feature = "serial")]
    pub fn open_serial(serial: &xethru_transport::SerialConfig, config: ModuleConfig) -> Result<Self> {
        Ok(Self::new(Connection::open_serial(serial, config)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Snapshot of the tracked device state.
    pub fn control_state(&self) -> DeviceControlState {
        self.state().clone()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.connection.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    pub fn close(&self) {
        self.connection.close();
    }

    // -- system --------------------------------------------------------

    pub fn set_debug_level(&self, level: u8) -> Result<()> {
        if level > MAX_DEBUG_LEVEL {
            return Err(ModuleError::InvalidArgument(format!(
                "debug level {level} out of range 0..={MAX_DEBUG_LEVEL}"
            )));
        }
        self.command(codes::SET_DEBUG_LEVEL, &[level]).map(drop)
    }

    /// Change the module's serial baud rate. The host side of the link must
    /// be reopened at the new rate afterwards.
    pub fn set_baudrate(&self, baudrate: u32) -> Result<()> {
        if baudrate == 0 {
            return Err(ModuleError::InvalidArgument("baud rate must be nonzero".into()));
        }
        let payload = PayloadWriter::new().u32(baudrate).finish();
        self.command(codes::SET_BAUDRATE, &payload).map(drop)
    }

    pub fn ping(&self) -> Result<Pong> {
        let data = self.command(codes::PING, &[])?;
        decode_response(codes::PING, &data, |r| r.u32().map(Pong))
    }

    pub fn get_system_info(&self, info: SystemInfoCode) -> Result<String> {
        let data = self.command(codes::GET_SYSTEM_INFO, &[info.wire_value()])?;
        decode_response(codes::GET_SYSTEM_INFO, &data, |r| r.rest_utf8())
    }

    /// Reset the module. The tracked state returns to its initial value;
    /// the connection stays open.
    pub fn module_reset(&self) -> Result<()> {
        let mut state = self.state();
        self.command(codes::MODULE_RESET, &[])?;
        state.reset();
        info!("module reset");
        Ok(())
    }

    /// Reset the module and close this connection. Reconnecting is up to the
    /// caller, since the link may re-enumerate.
    pub fn reset(&self) -> Result<()> {
        self.module_reset()?;
        self.close();
        Ok(())
    }

    pub fn reset_to_factory_preset(&self) -> Result<()> {
        let mut state = self.state();
        self.command(codes::FACTORY_RESET, &[])?;
        state.reset();
        info!("module reset to factory preset");
        Ok(())
    }

    /// Enter the firmware bootloader. Further application commands will not
    /// be answered.
    pub fn start_bootloader(&self) -> Result<()> {
        self.command(codes::START_BOOTLOADER, &[])?;
        info!("module entered bootloader");
        Ok(())
    }

    pub fn system_run_test(&self, test_code: u8) -> Result<Bytes> {
        self.command(codes::SYSTEM_RUN_TEST, &[test_code])
    }

    // -- profile and mode ----------------------------------------------

    pub fn load_profile(&self, profile_id: u32) -> Result<()> {
        let mut state = self.state();
        state.check_load_profile()?;
        let payload = PayloadWriter::new().u32(profile_id).finish();
        self.command(codes::LOAD_PROFILE, &payload)?;
        state.apply_load_profile(profile_id);
        info!(profile_id = format_args!("{profile_id:#010x}"), "profile loaded");
        Ok(())
    }

    /// Loaded profile as reported by the module (`None` if no profile).
    pub fn get_profile_id(&self) -> Result<Option<u32>> {
        let mut state = self.state();
        let data = self.command(codes::GET_PROFILE_ID, &[])?;
        let id = decode_response(codes::GET_PROFILE_ID, &data, |r| r.u32())?;
        state.refresh_profile(id);
        Ok(state.profile_id)
    }

    pub fn set_sensor_mode(&self, mode: SensorMode, param: u8) -> Result<()> {
        let mut state = self.state();
        state.check_sensor_mode(mode)?;
        self.command(codes::SET_SENSOR_MODE, &[mode.wire_value(), param])?;
        let previous = state.sensor_mode;
        state.apply_sensor_mode(mode);
        info!(from = %previous, to = %mode, "sensor mode changed");
        Ok(())
    }

    pub fn get_sensor_mode(&self) -> Result<SensorMode> {
        let mut state = self.state();
        let data = self.command(codes::GET_SENSOR_MODE, &[])?;
        let mode = decode_response(codes::GET_SENSOR_MODE, &data, |r| {
            let value = r.u8()?;
            SensorMode::from_wire(value).ok_or(PayloadError::Invalid {
                field: "sensor mode",
                value: u32::from(value),
            })
        })?;
        state.refresh_sensor_mode(mode);
        Ok(mode)
    }

    // -- detection -----------------------------------------------------

    pub fn set_sensitivity(&self, sensitivity: u32) -> Result<()> {
        if sensitivity > MAX_SENSITIVITY {
            return Err(ModuleError::InvalidArgument(format!(
                "sensitivity {sensitivity} out of range 0..={MAX_SENSITIVITY}"
            )));
        }
        let payload = PayloadWriter::new().u32(sensitivity).finish();
        self.command(codes::SET_SENSITIVITY, &payload).map(drop)
    }

    pub fn set_detection_zone(&self, start: f32, end: f32) -> Result<()> {
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ModuleError::InvalidArgument(format!(
                "detection zone {start}..{end} must be finite with start < end"
            )));
        }
        let payload = PayloadWriter::new().f32(start).f32(end).finish();
        self.command(codes::SET_DETECTION_ZONE, &payload).map(drop)
    }

    pub fn get_detection_zone(&self) -> Result<DetectionZone> {
        let data = self.command(codes::GET_DETECTION_ZONE, &[])?;
        decode_response(codes::GET_DETECTION_ZONE, &data, |r| {
            Ok(DetectionZone {
                start: r.f32()?,
                end: r.f32()?,
            })
        })
    }

    pub fn get_detection_zone_limits(&self) -> Result<DetectionZoneLimits> {
        let data = self.command(codes::GET_DETECTION_ZONE_LIMITS, &[])?;
        decode_response(codes::GET_DETECTION_ZONE_LIMITS, &data, |r| {
            Ok(DetectionZoneLimits {
                min: r.f32()?,
                max: r.f32()?,
                step: r.f32()?,
            })
        })
    }

    pub fn set_led_control(&self, mode: LedMode, intensity: u8) -> Result<()> {
        if intensity > MAX_LED_INTENSITY {
            return Err(ModuleError::InvalidArgument(format!(
                "LED intensity {intensity} out of range 0..={MAX_LED_INTENSITY}"
            )));
        }
        self.command(codes::SET_LED_CONTROL, &[mode.wire_value(), intensity])
            .map(drop)
    }

    // -- outputs -------------------------------------------------------

    /// Enable or disable an output feature.
    ///
    /// Enabling one half of a coupled pair (baseband IQ / amplitude-phase,
    /// or the float / byte form of pulse-Doppler or noisemap for a speed
    /// class) first disables the other half, so up to two commands are sent.
    pub fn set_output_control(&self, feature: OutputFeature, control: OutputControl) -> Result<()> {
        let mut state = self.state();
        for step in state.plan_output(feature, control) {
            let payload = PayloadWriter::new()
                .u32(step.feature.wire_value())
                .u32(step.control.bits())
                .finish();
            self.command(codes::SET_OUTPUT_CONTROL, &payload)?;
            state.apply_output(step.feature, step.control);
        }
        Ok(())
    }

    // -- noisemap ------------------------------------------------------

    pub fn load_noisemap(&self) -> Result<()> {
        self.command(codes::LOAD_NOISEMAP, &[]).map(drop)
    }

    pub fn store_noisemap(&self) -> Result<()> {
        self.command(codes::STORE_NOISEMAP, &[]).map(drop)
    }

    pub fn set_noisemap_control(&self, control: NoisemapControl) -> Result<()> {
        let mut state = self.state();
        let payload = PayloadWriter::new().u32(control.bits()).finish();
        self.command(codes::SET_NOISEMAP_CONTROL, &payload)?;
        state.noisemap_control = control;
        Ok(())
    }

    pub fn get_noisemap_control(&self) -> Result<NoisemapControl> {
        let mut state = self.state();
        let data = self.command(codes::GET_NOISEMAP_CONTROL, &[])?;
        let control = decode_response(codes::GET_NOISEMAP_CONTROL, &data, |r| {
            r.u32().map(NoisemapControl)
        })?;
        state.noisemap_control = control;
        Ok(control)
    }

    // -- parameter files -----------------------------------------------

    pub fn get_parameter_file(&self, name: &str) -> Result<String> {
        let name_len = checked_name(name)?;
        let payload = PayloadWriter::new().u16(name_len).bytes(name.as_bytes()).finish();
        let data = self.command(codes::GET_PARAMETER_FILE, &payload)?;
        decode_response(codes::GET_PARAMETER_FILE, &data, |r| r.rest_utf8())
    }

    pub fn set_parameter_file(&self, name: &str, contents: &str) -> Result<()> {
        let name_len = checked_name(name)?;
        // name_len u16 + name + data_len u32 + data must fit one frame.
        let total = 2 + name.len() + 4 + contents.len();
        if total > DEFAULT_MAX_PAYLOAD {
            return Err(ModuleError::InvalidArgument(format!(
                "parameter file {name} needs {total} payload bytes, max {DEFAULT_MAX_PAYLOAD}"
            )));
        }
        let data_len = contents.len() as u32;
        let payload = PayloadWriter::new()
            .u16(name_len)
            .bytes(name.as_bytes())
            .u32(data_len)
            .bytes(contents.as_bytes())
            .finish();
        self.command(codes::SET_PARAMETER_FILE, &payload).map(drop)
    }

    // -- data streams --------------------------------------------------

    pub fn queues(&self) -> &DataQueues {
        self.connection.queues()
    }

    pub fn baseband_ap(&self) -> &SubscriptionQueue<BasebandApData> {
        &self.queues().baseband_ap
    }

    pub fn baseband_iq(&self) -> &SubscriptionQueue<BasebandIqData> {
        &self.queues().baseband_iq
    }

    pub fn respiration_legacy(&self) -> &SubscriptionQueue<RespirationData> {
        &self.queues().respiration_legacy
    }

    pub fn sleep(&self) -> &SubscriptionQueue<SleepData> {
        &self.queues().sleep
    }

    pub fn respiration_moving_list(&self) -> &SubscriptionQueue<RespirationMovingListData> {
        &self.queues().respiration_moving_list
    }

    pub fn respiration_detection_list(&self) -> &SubscriptionQueue<RespirationDetectionListData> {
        &self.queues().respiration_detection_list
    }

    pub fn pulse_doppler_float(&self) -> &SubscriptionQueue<PulseDopplerFloatData> {
        &self.queues().pulse_doppler_float
    }

    pub fn pulse_doppler_byte(&self) -> &SubscriptionQueue<PulseDopplerByteData> {
        &self.queues().pulse_doppler_byte
    }

    pub fn noisemap_float(&self) -> &SubscriptionQueue<NoisemapFloatData> {
        &self.queues().noisemap_float
    }

    pub fn noisemap_byte(&self) -> &SubscriptionQueue<NoisemapByteData> {
        &self.queues().noisemap_byte
    }

    fn command(&self, code: u8, payload: &[u8]) -> Result<Bytes> {
        self.connection.call(code, payload)
    }

    fn state(&self) -> MutexGuard<'_, DeviceControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for X4M200 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X4M200")
            .field("connection", &self.connection)
            .field("state", &*self.state())
            .finish()
    }
}

fn checked_name(name: &str) -> Result<u16> {
    if name.is_empty() {
        return Err(ModuleError::InvalidArgument(
            "parameter file name must not be empty".into(),
        ));
    }
    u16::try_from(name.len()).map_err(|_| {
        ModuleError::InvalidArgument(format!(
            "parameter file name is {} bytes, max {}",
            name.len(),
            u16::MAX
        ))
    })
}

fn decode_response<T>(
    code: u8,
    data: &[u8],
    decode: impl FnOnce(&mut PayloadReader<'_>) -> std::result::Result<T, PayloadError>,
) -> Result<T> {
    let mut reader = PayloadReader::new(data);
    decode(&mut reader)
        .and_then(|value| reader.finish().map(|()| value))
        .map_err(|err| ModuleError::MalformedResponse {
            code,
            reason: err.to_string(),
        })
}
