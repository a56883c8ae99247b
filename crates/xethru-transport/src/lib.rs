//! Byte-stream transport for XeThru radar modules.
//!
//! Provides a single [`RadarStream`] type over the links a module can be
//! reached through:
//! - Serial / USB-CDC ports (behind the `serial` feature)
//! - Unix domain sockets (Linux/macOS), used by simulators and serial bridges
//!
//! This is the lowest layer of the driver. The frame codec and the module
//! session build on the `Read + Write` surface provided here.

pub mod error;
pub mod stream;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::RadarStream;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, DEFAULT_BAUD_RATE};
