use std::time::Duration;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::RadarStream;

/// Default baud rate of XeThru modules after power-up.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Configuration for opening a module over a serial / USB-CDC port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// OS port name, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    /// Line rate.
    pub baud_rate: u32,
    /// Read timeout. The module session relies on reads returning
    /// periodically so it can notice a close.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Configuration for `port` with default line settings.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(50),
        }
    }
}

impl RadarStream {
    /// Open a serial port (8N1, no flow control).
    pub fn open_serial(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;
        info!(port = %config.port, baud = config.baud_rate, "opened serial port");
        Ok(Self::from_serial(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(cfg.port, "/dev/ttyACM0");
        assert_eq!(cfg.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(cfg.timeout, Duration::from_millis(50));
    }

    #[test]
    fn open_missing_port_fails() {
        let cfg = SerialConfig::new("/dev/xethru-does-not-exist");
        let result = RadarStream::open_serial(&cfg);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
