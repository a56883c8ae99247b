use std::time::Duration;

/// Errors that can occur in module operations.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xethru_transport::TransportError),

    /// Frame-level error on the command path.
    #[error("frame error: {0}")]
    Frame(#[from] xethru_frame::FrameError),

    /// No response arrived within the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The module answered with a nonzero status.
    #[error("module rejected command {code:#04x} with status {status:#04x}")]
    DeviceRejected { code: u8, status: u8 },

    /// The operation violates the device control state machine.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An argument is outside the range the module accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection was closed while the operation was pending.
    #[error("connection closed")]
    Closed,

    /// A response frame arrived but its data could not be decoded.
    #[error("malformed response to command {code:#04x}: {reason}")]
    MalformedResponse { code: u8, reason: String },
}

pub type Result<T> = std::result::Result<T, ModuleError>;
