//! Device control state: loaded profile, sensor mode and output selection.
//!
//! Everything here is pure. The driver validates a request against the
//! current state, sends the planned commands, and applies each one as the
//! module acknowledges it, all under one lock.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{ModuleError, Result};
use crate::types::{NoisemapControl, OutputControl, OutputFeature, SensorMode};

/// Which baseband representation is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseband {
    AmplitudePhase,
    Iq,
}

impl Baseband {
    fn feature(self) -> OutputFeature {
        match self {
            Baseband::AmplitudePhase => OutputFeature::BasebandAmplitudePhase,
            Baseband::Iq => OutputFeature::BasebandIq,
        }
    }
}

/// Float/byte output selection per speed class (`OutputControl::SLOW`,
/// `OutputControl::FAST` bits). A class is never set in both fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpeedClassOutputs {
    pub float: u32,
    pub byte: u32,
}

/// One `SET_OUTPUT_CONTROL` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStep {
    pub feature: OutputFeature,
    pub control: OutputControl,
}

impl OutputStep {
    fn new(feature: OutputFeature, control: OutputControl) -> Self {
        Self { feature, control }
    }
}

/// Host-side view of the module's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceControlState {
    pub profile_id: Option<u32>,
    pub sensor_mode: SensorMode,
    pub baseband: Option<Baseband>,
    pub pulse_doppler: SpeedClassOutputs,
    pub noisemap: SpeedClassOutputs,
    /// Enabled features without a coupling rule.
    pub outputs: BTreeSet<OutputFeature>,
    pub noisemap_control: NoisemapControl,
}

impl DeviceControlState {
    pub fn check_load_profile(&self) -> Result<()> {
        match self.sensor_mode {
            SensorMode::Stopped | SensorMode::Idle => Ok(()),
            mode => Err(ModuleError::InvalidState(format!(
                "cannot load a profile while {mode}; stop or idle the sensor first"
            ))),
        }
    }

    pub fn apply_load_profile(&mut self, profile_id: u32) {
        self.profile_id = Some(profile_id);
        self.sensor_mode = SensorMode::Idle;
    }

    pub fn check_sensor_mode(&self, target: SensorMode) -> Result<()> {
        match (target, self.sensor_mode) {
            (SensorMode::Stopped | SensorMode::Manual, _) => Ok(()),
            (SensorMode::Running, SensorMode::Manual) => Err(ModuleError::InvalidState(
                "cannot run from manual mode; stop or idle the sensor first".to_string(),
            )),
            (SensorMode::Running, _) if self.profile_id.is_none() => Err(
                ModuleError::InvalidState("cannot run without a loaded profile".to_string()),
            ),
            (SensorMode::Running, _) => Ok(()),
            (SensorMode::Idle, SensorMode::Stopped) => Err(ModuleError::InvalidState(
                "cannot idle a stopped sensor; load a profile first".to_string(),
            )),
            (SensorMode::Idle, _) => Ok(()),
        }
    }

    pub fn apply_sensor_mode(&mut self, target: SensorMode) {
        if target == SensorMode::Stopped {
            self.profile_id = None;
        }
        self.sensor_mode = target;
    }

    /// Commands needed to apply `control` to `feature` without ever leaving
    /// a coupled pair with both halves enabled.
    pub fn plan_output(&self, feature: OutputFeature, control: OutputControl) -> Vec<OutputStep> {
        let mut steps = Vec::with_capacity(2);
        match feature {
            OutputFeature::BasebandIq | OutputFeature::BasebandAmplitudePhase => {
                if control.is_enabled() {
                    if let Some(current) = self.baseband {
                        if current.feature() != feature {
                            steps.push(OutputStep::new(current.feature(), OutputControl::DISABLE));
                        }
                    }
                }
            }
            f if f.has_speed_classes() => {
                let (other, other_bits) = self.counterpart(f);
                let classes = control.speed_classes();
                if other_bits & classes != 0 {
                    steps.push(OutputStep::new(other, OutputControl(other_bits & !classes)));
                }
            }
            _ => {}
        }
        steps.push(OutputStep::new(feature, control));
        steps
    }

    /// Record one acknowledged `SET_OUTPUT_CONTROL`, including the module's
    /// own coupling: disabling either baseband output disables both.
    pub fn apply_output(&mut self, feature: OutputFeature, control: OutputControl) {
        match feature {
            OutputFeature::BasebandIq => {
                self.baseband = control.is_enabled().then_some(Baseband::Iq);
            }
            OutputFeature::BasebandAmplitudePhase => {
                self.baseband = control.is_enabled().then_some(Baseband::AmplitudePhase);
            }
            OutputFeature::PulseDopplerFloat => {
                Self::select(&mut self.pulse_doppler, true, control.speed_classes())
            }
            OutputFeature::PulseDopplerByte => {
                Self::select(&mut self.pulse_doppler, false, control.speed_classes())
            }
            OutputFeature::NoisemapFloat => {
                Self::select(&mut self.noisemap, true, control.speed_classes())
            }
            OutputFeature::NoisemapByte => {
                Self::select(&mut self.noisemap, false, control.speed_classes())
            }
            other => {
                if control.is_enabled() {
                    self.outputs.insert(other);
                } else {
                    self.outputs.remove(&other);
                }
            }
        }
    }

    pub fn is_output_enabled(&self, feature: OutputFeature) -> bool {
        match feature {
            OutputFeature::BasebandIq => self.baseband == Some(Baseband::Iq),
            OutputFeature::BasebandAmplitudePhase => {
                self.baseband == Some(Baseband::AmplitudePhase)
            }
            OutputFeature::PulseDopplerFloat => self.pulse_doppler.float != 0,
            OutputFeature::PulseDopplerByte => self.pulse_doppler.byte != 0,
            OutputFeature::NoisemapFloat => self.noisemap.float != 0,
            OutputFeature::NoisemapByte => self.noisemap.byte != 0,
            other => self.outputs.contains(&other),
        }
    }

    pub fn enabled_outputs(&self) -> Vec<OutputFeature> {
        OutputFeature::ALL
            .into_iter()
            .filter(|f| self.is_output_enabled(*f))
            .collect()
    }

    /// Adopt the profile id reported by the module (0 = none).
    pub fn refresh_profile(&mut self, profile_id: u32) {
        self.profile_id = (profile_id != 0).then_some(profile_id);
    }

    pub fn refresh_sensor_mode(&mut self, mode: SensorMode) {
        self.sensor_mode = mode;
    }

    /// Back to the state of a freshly reset module.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn counterpart(&self, feature: OutputFeature) -> (OutputFeature, u32) {
        match feature {
            OutputFeature::PulseDopplerFloat => {
                (OutputFeature::PulseDopplerByte, self.pulse_doppler.byte)
            }
            OutputFeature::PulseDopplerByte => {
                (OutputFeature::PulseDopplerFloat, self.pulse_doppler.float)
            }
            OutputFeature::NoisemapFloat => (OutputFeature::NoisemapByte, self.noisemap.byte),
            _ => (OutputFeature::NoisemapFloat, self.noisemap.float),
        }
    }

    fn select(pair: &mut SpeedClassOutputs, float: bool, classes: u32) {
        if float {
            pair.float = classes;
            pair.byte &= !classes;
        } else {
            pair.byte = classes;
            pair.float &= !classes;
        }
    }
}
