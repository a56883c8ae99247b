use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codes::CodeClass;
use crate::error::{FrameError, ProtocolError, Result};

/// Frame start marker.
pub const START: u8 = 0x7D;

/// Frame end marker.
pub const END: u8 = 0x7E;

/// Escape prefix for marker bytes inside a frame.
pub const ESCAPE: u8 = 0x7F;

/// Unescaped bytes between the markers besides the payload:
/// code (1) + length (2) + checksum (1).
pub const OVERHEAD: usize = 4;

/// Default (and largest representable) payload size: 65535 bytes.
pub const DEFAULT_MAX_PAYLOAD: usize = u16::MAX as usize;

/// A framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message code (command, response, or data stream).
    pub code: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(code: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    /// Range class of this frame's code.
    pub fn class(&self) -> CodeClass {
        CodeClass::of(self.code)
    }

    /// The total wire size of this frame, escapes included.
    ///
    /// `None` when the payload does not fit the 16-bit length field; such a
    /// frame cannot be encoded.
    pub fn wire_size(&self) -> Option<usize> {
        let len = u16::try_from(self.payload.len()).ok()?;
        let [lo, hi] = len.to_le_bytes();
        let checksum = checksum(self.code, &self.payload);
        let escapes = [self.code, lo, hi, checksum]
            .iter()
            .chain(self.payload.iter())
            .filter(|b| needs_escape(**b))
            .count();
        Some(2 + OVERHEAD + self.payload.len() + escapes)
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (before escaping):
/// ```text
/// ┌────────┬──────────┬───────────┬──────────────┬──────────┬────────┐
/// │ START  │ Code     │ Length    │ Payload      │ Checksum │ END    │
/// │ 0x7D   │ (1B)     │ (2B LE)   │ (Length B)   │ (1B XOR) │ 0x7E   │
/// └────────┴──────────┴───────────┴──────────────┴──────────┴────────┘
/// ```
///
/// Any START, END or ESCAPE byte between the markers is sent as
/// `ESCAPE, byte`. The checksum is the XOR of START and every unescaped byte
/// up to the end of the payload.
pub fn encode_frame(code: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > DEFAULT_MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: DEFAULT_MAX_PAYLOAD,
        });
    }
    let [lo, hi] = (payload.len() as u16).to_le_bytes();

    dst.reserve(2 + 2 * (OVERHEAD + payload.len()));
    dst.put_u8(START);
    let mut sum = START;
    for &byte in [code, lo, hi].iter().chain(payload) {
        sum ^= byte;
        put_escaped(dst, byte);
    }
    put_escaped(dst, sum);
    dst.put_u8(END);
    Ok(())
}

/// Checksum of a frame with the given code and payload. Payloads longer
/// than [`DEFAULT_MAX_PAYLOAD`] are rejected by [`encode_frame`] before this
/// is consulted.
pub fn checksum(code: u8, payload: &[u8]) -> u8 {
    let [lo, hi] = (payload.len() as u16).to_le_bytes();
    [code, lo, hi]
        .iter()
        .chain(payload)
        .fold(START, |acc, byte| acc ^ byte)
}

fn needs_escape(byte: u8) -> bool {
    matches!(byte, START | END | ESCAPE)
}

fn put_escaped(dst: &mut BytesMut, byte: u8) {
    if needs_escape(byte) {
        dst.put_u8(ESCAPE);
    }
    dst.put_u8(byte);
}

/// Outcome of decoding one frame candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete, checksum-valid frame.
    Frame(Frame),
    /// A rejected candidate; the decoder has already resynchronized.
    Corrupt(ProtocolError),
}

/// Running totals kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Valid frames produced.
    pub frames: u64,
    /// Rejected candidates reported.
    pub corrupt: u64,
    /// Bytes dropped while hunting or in rejected candidates.
    pub discarded_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    /// Outside a frame. `quiet` suppresses the garbage report for noise that
    /// is the tail of an already reported oversized candidate.
    Hunting { noise: usize, quiet: bool },
    /// Between START and END.
    Body { escaped: bool },
}

/// Incremental frame decoder.
///
/// Bytes are pushed in arbitrary chunks; complete frames come out in order.
/// Incomplete trailing bytes are kept for the next call.
#[derive(Debug)]
pub struct FrameDecoder {
    pending: BytesMut,
    body: BytesMut,
    state: ScanState,
    max_payload_size: usize,
    stats: DecodeStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder accepting payloads up to [`DEFAULT_MAX_PAYLOAD`].
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a decoder with an explicit payload limit.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            body: BytesMut::new(),
            state: ScanState::Hunting {
                noise: 0,
                quiet: false,
            },
            max_payload_size: max_payload_size.min(DEFAULT_MAX_PAYLOAD),
            stats: DecodeStats::default(),
        }
    }

    /// Append bytes without decoding them yet.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Append bytes and iterate over every event they complete.
    ///
    /// Dropping the iterator early is fine; unscanned bytes stay buffered.
    pub fn feed(&mut self, bytes: &[u8]) -> Decoded<'_> {
        self.push_bytes(bytes);
        Decoded { decoder: self }
    }

    /// Decode the next event from buffered bytes, if one is complete.
    pub fn next_event(&mut self) -> Option<DecodeEvent> {
        while self.pending.has_remaining() {
            let byte = self.pending.get_u8();
            match self.state {
                ScanState::Hunting { noise, quiet } => {
                    if byte != START {
                        self.state = ScanState::Hunting {
                            noise: noise + 1,
                            quiet,
                        };
                        continue;
                    }
                    self.stats.discarded_bytes += noise as u64;
                    self.body.clear();
                    self.state = ScanState::Body { escaped: false };
                    if noise > 0 && !quiet {
                        return Some(self.reject(ProtocolError::Garbage { len: noise }));
                    }
                }
                ScanState::Body { escaped: true } => {
                    self.body.put_u8(byte);
                    self.state = ScanState::Body { escaped: false };
                }
                ScanState::Body { escaped: false } => match byte {
                    ESCAPE => self.state = ScanState::Body { escaped: true },
                    START => {
                        let len = self.body.len();
                        self.stats.discarded_bytes += len as u64 + 1;
                        self.body.clear();
                        return Some(self.reject(ProtocolError::Truncated { len }));
                    }
                    END => return Some(self.finish_body()),
                    _ => self.body.put_u8(byte),
                },
            }

            if self.body.len() > self.max_payload_size + OVERHEAD {
                self.stats.discarded_bytes += self.body.len() as u64 + 1;
                self.body.clear();
                self.state = ScanState::Hunting {
                    noise: 0,
                    quiet: true,
                };
                return Some(self.reject(ProtocolError::Oversized {
                    max: self.max_payload_size,
                }));
            }
        }
        None
    }

    /// Running totals.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Bytes held but not yet turned into an event.
    pub fn buffered(&self) -> usize {
        self.pending.len() + self.body.len()
    }

    /// Drop all buffered bytes and start hunting for START again.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.body.clear();
        self.state = ScanState::Hunting {
            noise: 0,
            quiet: false,
        };
    }

    fn finish_body(&mut self) -> DecodeEvent {
        self.state = ScanState::Hunting {
            noise: 0,
            quiet: false,
        };
        let body = self.body.split().freeze();

        if body.len() < OVERHEAD {
            self.stats.discarded_bytes += body.len() as u64 + 2;
            return self.reject(ProtocolError::Truncated { len: body.len() });
        }

        let code = body[0];
        let declared = u16::from_le_bytes([body[1], body[2]]) as usize;
        let actual = body.len() - OVERHEAD;
        if declared != actual {
            self.stats.discarded_bytes += body.len() as u64 + 2;
            return self.reject(ProtocolError::LengthMismatch { declared, actual });
        }

        let (content, trailer) = body.split_at(body.len() - 1);
        let expected = content.iter().fold(START, |acc, byte| acc ^ byte);
        if expected != trailer[0] {
            self.stats.discarded_bytes += body.len() as u64 + 2;
            return self.reject(ProtocolError::ChecksumMismatch {
                code,
                expected,
                actual: trailer[0],
            });
        }

        self.stats.frames += 1;
        DecodeEvent::Frame(Frame {
            code,
            payload: body.slice(3..body.len() - 1),
        })
    }

    fn reject(&mut self, err: ProtocolError) -> DecodeEvent {
        self.stats.corrupt += 1;
        DecodeEvent::Corrupt(err)
    }
}

/// Events completed by one [`FrameDecoder::feed`] call.
pub struct Decoded<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Decoded<'_> {
    type Item = DecodeEvent;

    fn next(&mut self) -> Option<DecodeEvent> {
        self.decoder.next_event()
    }
}

/// Default number of bytes requested per read from the link.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024;

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 65535.
    pub max_payload_size: usize,
    /// Bytes requested per read. Default: 4096.
    pub read_chunk_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
