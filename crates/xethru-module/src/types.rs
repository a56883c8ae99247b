//! Typed command arguments and results.

use std::fmt;

use serde::Serialize;

/// Sensor run mode, as tracked by the device control state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    /// No profile loaded, not sampling. Wire value `0x13`.
    #[default]
    Stopped,
    /// Profile loaded, not sampling. Wire value `0x11`.
    Idle,
    /// Profile running. Wire value `0x01`.
    Running,
    /// Manual (raw radar) mode. Wire value `0x12`.
    Manual,
}

impl SensorMode {
    /// Value sent in `SET_SENSOR_MODE` and returned by `GET_SENSOR_MODE`.
    pub fn wire_value(self) -> u8 {
        match self {
            SensorMode::Running => 0x01,
            SensorMode::Idle => 0x11,
            SensorMode::Manual => 0x12,
            SensorMode::Stopped => 0x13,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(SensorMode::Running),
            0x11 => Some(SensorMode::Idle),
            0x12 => Some(SensorMode::Manual),
            0x13 => Some(SensorMode::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorMode::Stopped => "stopped",
            SensorMode::Idle => "idle",
            SensorMode::Running => "running",
            SensorMode::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Output feature selectable with `SET_OUTPUT_CONTROL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFeature {
    BasebandIq,
    BasebandAmplitudePhase,
    PulseDopplerFloat,
    PulseDopplerByte,
    NoisemapFloat,
    NoisemapByte,
    RespirationStatus,
    RespirationStatusExt,
    SleepStatus,
    RespirationMovingList,
    RespirationDetectionList,
}

impl OutputFeature {
    pub const ALL: [OutputFeature; 11] = [
        OutputFeature::BasebandIq,
        OutputFeature::BasebandAmplitudePhase,
        OutputFeature::PulseDopplerFloat,
        OutputFeature::PulseDopplerByte,
        OutputFeature::NoisemapFloat,
        OutputFeature::NoisemapByte,
        OutputFeature::RespirationStatus,
        OutputFeature::RespirationStatusExt,
        OutputFeature::SleepStatus,
        OutputFeature::RespirationMovingList,
        OutputFeature::RespirationDetectionList,
    ];

    pub fn wire_value(self) -> u32 {
        match self {
            OutputFeature::BasebandIq => 0x0C,
            OutputFeature::BasebandAmplitudePhase => 0x0D,
            OutputFeature::PulseDopplerFloat => 0x10,
            OutputFeature::PulseDopplerByte => 0x11,
            OutputFeature::NoisemapFloat => 0x12,
            OutputFeature::NoisemapByte => 0x13,
            OutputFeature::RespirationStatus => 0x2375_FE26,
            OutputFeature::RespirationStatusExt => 0x2375_A16E,
            OutputFeature::SleepStatus => 0x2375_A16C,
            OutputFeature::RespirationMovingList => 0x610A_3B00,
            OutputFeature::RespirationDetectionList => 0x610A_3B02,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_value() == value)
    }

    /// Whether the control word is a slow/fast speed-class bitfield.
    pub fn has_speed_classes(self) -> bool {
        matches!(
            self,
            OutputFeature::PulseDopplerFloat
                | OutputFeature::PulseDopplerByte
                | OutputFeature::NoisemapFloat
                | OutputFeature::NoisemapByte
        )
    }
}

/// Control word for `SET_OUTPUT_CONTROL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OutputControl(pub u32);

impl OutputControl {
    pub const DISABLE: OutputControl = OutputControl(0);
    pub const ENABLE: OutputControl = OutputControl(1);
    /// Slow pulse-Doppler/noisemap class.
    pub const SLOW: OutputControl = OutputControl(1 << 1);
    /// Fast pulse-Doppler/noisemap class.
    pub const FAST: OutputControl = OutputControl(1 << 2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_enabled(self) -> bool {
        self.0 != 0
    }

    /// Speed classes selected by this control word. A plain enable selects
    /// the slow class.
    pub fn speed_classes(self) -> u32 {
        let classes = self.0 & (Self::SLOW.0 | Self::FAST.0);
        if classes == 0 && self.0 != 0 {
            Self::SLOW.0
        } else {
            classes
        }
    }
}

impl std::ops::BitOr for OutputControl {
    type Output = OutputControl;

    fn bitor(self, rhs: Self) -> Self {
        OutputControl(self.0 | rhs.0)
    }
}

/// Noisemap control bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NoisemapControl(pub u32);

impl NoisemapControl {
    pub const ENABLE: NoisemapControl = NoisemapControl(1 << 0);
    pub const ADAPTIVE: NoisemapControl = NoisemapControl(1 << 1);
    pub const INIT_ON_RESET: NoisemapControl = NoisemapControl(1 << 2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: NoisemapControl) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: NoisemapControl) -> Self {
        NoisemapControl(self.0 | other.0)
    }

    pub fn without(self, other: NoisemapControl) -> Self {
        NoisemapControl(self.0 & !other.0)
    }
}

/// System information item for `GET_SYSTEM_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemInfoCode {
    ItemNumber,
    OrderCode,
    FirmwareId,
    Version,
    Build,
    SerialNumber,
    VersionList,
}

impl SystemInfoCode {
    pub const ALL: [SystemInfoCode; 7] = [
        SystemInfoCode::ItemNumber,
        SystemInfoCode::OrderCode,
        SystemInfoCode::FirmwareId,
        SystemInfoCode::Version,
        SystemInfoCode::Build,
        SystemInfoCode::SerialNumber,
        SystemInfoCode::VersionList,
    ];

    pub fn wire_value(self) -> u8 {
        match self {
            SystemInfoCode::ItemNumber => 0x00,
            SystemInfoCode::OrderCode => 0x01,
            SystemInfoCode::FirmwareId => 0x02,
            SystemInfoCode::Version => 0x03,
            SystemInfoCode::Build => 0x04,
            SystemInfoCode::SerialNumber => 0x06,
            SystemInfoCode::VersionList => 0x07,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SystemInfoCode::ItemNumber => "item_number",
            SystemInfoCode::OrderCode => "order_code",
            SystemInfoCode::FirmwareId => "firmware_id",
            SystemInfoCode::Version => "version",
            SystemInfoCode::Build => "build",
            SystemInfoCode::SerialNumber => "serial_number",
            SystemInfoCode::VersionList => "version_list",
        }
    }
}

/// LED behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedMode {
    Off,
    Simple,
    Full,
}

impl LedMode {
    pub fn wire_value(self) -> u8 {
        match self {
            LedMode::Off => 0,
            LedMode::Simple => 1,
            LedMode::Full => 2,
        }
    }
}

/// Answer to `PING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pong(pub u32);

impl Pong {
    /// Module is up and ready for commands.
    pub const READY: u32 = 0xAAEE_AEEA;
    /// Module is up but not ready.
    pub const NOT_READY: u32 = 0xAEEA_EEAA;

    pub fn is_ready(self) -> bool {
        self.0 == Self::READY
    }
}

/// Detection zone in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionZone {
    pub start: f32,
    pub end: f32,
}

/// Range the detection zone may be set within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionZoneLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

/// Well-known profile identifiers.
pub mod profiles {
    /// Adult respiration detection.
    pub const RESPIRATION_2: u32 = 0x064E_57AD;
    /// Adult respiration with movement lists.
    pub const RESPIRATION_3: u32 = 0x47FA_BEBA;
    /// Sleep monitoring.
    pub const SLEEP: u32 = 0x00F1_7B17;
}
