/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport could not be configured.
    #[error("transport error: {0}")]
    Transport(#[from] xethru_transport::TransportError),

    /// The connection was closed (EOF on read, zero-length write).
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// A single rejected frame candidate.
///
/// These are recoverable: the decoder has already resynchronized when one is
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The trailer checksum does not match the frame contents.
    #[error("checksum mismatch on code {code:#04x} (expected {expected:#04x}, got {actual:#04x})")]
    ChecksumMismatch { code: u8, expected: u8, actual: u8 },

    /// The length field disagrees with the bytes between the markers.
    #[error("length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// A frame ended before its header and checksum were complete, or a new
    /// START marker arrived before END.
    #[error("truncated frame ({len} bytes)")]
    Truncated { len: usize },

    /// A frame grew past the maximum payload size without an END marker.
    #[error("frame exceeds maximum payload size ({max} bytes)")]
    Oversized { max: usize },

    /// Bytes outside any frame were skipped while hunting for START.
    #[error("skipped {len} bytes outside a frame")]
    Garbage { len: usize },
}
