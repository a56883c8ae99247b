//! Host driver for XeThru X4M200 radar modules.
//!
//! The driver talks to the module over a byte link (serial/USB-CDC or a Unix
//! socket bridge), frames commands with the module's escaped, checksummed
//! wire format, and delivers decoded sensor data through per-type queues.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte links to the module (serial behind the `serial` feature, Unix sockets)
//! - [`frame`]: frame codec, blocking reader/writer, optional tokio codec (`async` feature)
//! - [`module`]: connection, command channel, data queues and the [`X4M200`] driver

/// Re-export transport types.
pub mod transport {
    pub use xethru_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xethru_frame::*;
}

/// Re-export module driver types.
pub mod module {
    pub use xethru_module::*;
}

pub use xethru_module::{ModuleConfig, ModuleError, X4M200};
