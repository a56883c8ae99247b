//! Protocol engine and X4M200 driver for XeThru radar modules.
//!
//! A [`Connection`] owns one radar link. Commands go out through a
//! single-flight command channel and block until the module answers or the
//! deadline passes. A background receive loop decodes every incoming frame,
//! hands responses to the waiting caller, and pushes streaming data into one
//! [`SubscriptionQueue`] per data type.
//!
//! [`X4M200`] layers the module's command set on top and tracks the sensor
//! mode, loaded profile, and output selection in a [`DeviceControlState`].
//!
//! ```no_run
//! use xethru_module::{ModuleConfig, OutputControl, OutputFeature, SensorMode, X4M200};
//!
//! let radar = X4M200::connect_unix("/tmp/x4m200.sock", ModuleConfig::default())?;
//! radar.load_profile(xethru_module::profiles::SLEEP)?;
//! radar.set_output_control(OutputFeature::SleepStatus, OutputControl::ENABLE)?;
//! radar.set_sensor_mode(SensorMode::Running, 0)?;
//! let sleep = radar.sleep().read()?;
//! println!("respiration rate {}", sleep.respiration_rate);
//! # Ok::<(), xethru_module::ModuleError>(())
//! ```

mod command;
pub mod config;
pub mod connection;
pub mod control;
mod dispatcher;
pub mod error;
pub mod messages;
mod payload;
pub mod queue;
pub mod types;
pub mod x4m200;

pub use config::{ModuleConfig, QueueCapacity};
pub use connection::Connection;
pub use control::{Baseband, DeviceControlState, OutputStep, SpeedClassOutputs};
pub use dispatcher::ConnectionStats;
pub use error::{ModuleError, Result};
pub use messages::{
    BasebandApData, BasebandIqData, DataDecodeError, DataMessage, NoisemapByteData,
    NoisemapFloatData, PulseDopplerByteData, PulseDopplerFloatData, PulseDopplerHeader,
    RespirationData, RespirationDetectionListData, RespirationMovingListData, SleepData,
};
pub use payload::PayloadError;
pub use queue::{DataQueues, SubscriptionQueue};
pub use types::{
    profiles, DetectionZone, DetectionZoneLimits, LedMode, NoisemapControl, OutputControl,
    OutputFeature, Pong, SensorMode, SystemInfoCode,
};
pub use x4m200::X4M200;
