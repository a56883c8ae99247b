//! Frame codec for the XeThru module communication protocol.
//!
//! Every message on the wire is framed with:
//! - A START marker (`0x7D`) and an END marker (`0x7E`)
//! - A 1-byte message code (command, response, or data stream)
//! - A 2-byte little-endian payload length
//! - A 1-byte XOR checksum
//!
//! Marker bytes inside the frame are escaped, so a frame boundary is always
//! recoverable. The decoder is incremental and never fails hard on a corrupt
//! frame: it reports a [`ProtocolError`] and resynchronizes on the next START.

pub mod codes;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;

pub use codec::{
    encode_frame, DecodeEvent, DecodeStats, Decoded, Frame, FrameConfig, FrameDecoder,
    DEFAULT_MAX_PAYLOAD, DEFAULT_READ_CHUNK_SIZE,
};
pub use codes::{code_name, command_for_response, response_code, CodeClass};
pub use error::{FrameError, ProtocolError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use framed::XethruCodec;
